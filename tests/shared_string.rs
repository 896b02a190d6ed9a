use cotext::{Change, SharedString};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng, rngs::StdRng};

#[test]
fn test_scenario_insert_delete_reinsert() {
    let mut ss = SharedString::from_string("world");
    assert_eq!(ss.to_text(), "world");

    ss.apply_change(&Change::new().insert("hello "), "me");
    assert_eq!(ss.to_text(), "hello world");

    ss.apply_change(&Change::new().retain(6).delete(5), "me");
    assert_eq!(ss.to_text(), "hello ");

    // "you" never saw me's edits: its offsets address "world"
    ss.apply_change(&Change::new().retain(6).insert("world"), "you");
    assert_eq!(ss.to_text(), "hello world");
}

#[test]
fn test_scenario_interleaved_branches() {
    let mut ss = SharedString::from_string("world");

    ss.apply_change(&Change::new().retain(5).insert("world"), "you");
    assert_eq!(ss.to_text(), "worldworld");

    ss.apply_change(&Change::new().insert("hello "), "me");
    assert_eq!(ss.to_text(), "hello worldworld");

    ss.apply_change(&Change::new().retain(6).delete(5), "me");
    assert_eq!(ss.to_text(), "hello world");
}

#[test]
fn test_scenario_rebased_changes() {
    let mut ss = SharedString::from_string("world");

    assert_eq!(
        ss.apply_change(&Change::new().retain(5).insert("world"), "you"),
        Change::new().retain(5).insert("world")
    );
    assert_eq!(ss.to_text(), "worldworld");

    assert_eq!(
        ss.apply_change(&Change::new().insert("hello "), "me"),
        Change::new().insert("hello ")
    );
    assert_eq!(ss.to_text(), "hello worldworld");

    // me's delete spans its whole view: "hello " plus the initial "world"
    assert_eq!(
        ss.apply_change(&Change::new().delete(11), "me"),
        Change::new().delete(11)
    );
    assert_eq!(ss.to_text(), "world");
}

#[test]
fn test_scenario_rebased_replay() {
    let mut ss = SharedString::from_string("abcde");
    let mut rebased = Vec::new();

    rebased.push(ss.apply_change(&Change::new().retain(2).delete(1).insert("f"), "user2"));
    assert_eq!(ss.to_text(), "abfde");

    rebased.push(ss.apply_change(&Change::new().delete(3), "user1"));
    assert_eq!(ss.to_text(), "fde");

    rebased.push(ss.apply_change(&Change::new().retain(1).insert("gh"), "user1"));
    assert_eq!(ss.to_text(), "fdghe");

    // the rebased stream replayed on a fresh copy under one branch gives
    // the same text
    let mut replay = SharedString::from_string("abcde");
    for change in &rebased {
        replay.apply_change(change, "merged");
    }
    assert_eq!(replay.to_text(), "fdghe");
}

/// One random change valid for a view of `length` characters; returns the
/// change and the view length after it.
fn random_change(rng: &mut StdRng, mut length: usize) -> (Change, usize) {
    let mut change = Change::new();
    let mut position = 0;

    for _ in 0..rng.gen_range(1..4) {
        if position < length && rng.gen_bool(0.5) {
            let skip = rng.gen_range(0..=(length - position).min(3));
            change = change.retain(skip);
            position += skip;
        }
        match rng.gen_range(0..3) {
            0 => {
                let text: String = (0..rng.gen_range(1..4))
                    .map(|_| char::from(b'a' + rng.gen_range(0..26)))
                    .collect();
                length += text.chars().count();
                position += text.chars().count();
                change = change.insert(text.as_str());
            }
            1 if position < length => {
                let deleted = rng.gen_range(1..=(length - position).min(3));
                change = change.delete(deleted);
                length -= deleted;
            }
            _ => {}
        }
    }

    (change, length)
}

/// Two random interleavings of the same per-user change sequences converge,
/// and replaying the first client's rebased stream on a fresh copy under a
/// single branch converges to the same content.
#[test]
fn test_random_interleavings_converge() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..50 {
        let initial = "some initial text";
        let per_user: Vec<Vec<Change>> = (0..3)
            .map(|_| {
                let mut length = initial.chars().count();
                (0..4)
                    .map(|_| {
                        let (change, new_length) = random_change(&mut rng, length);
                        length = new_length;
                        change
                    })
                    .collect()
            })
            .collect();

        let interleaving = |rng: &mut StdRng| {
            let mut queues: Vec<_> = per_user.iter().map(|changes| changes.iter()).collect();
            let mut order = Vec::new();
            let mut remaining: usize = per_user.iter().map(Vec::len).sum();
            while remaining > 0 {
                let user = rng.gen_range(0..queues.len());
                if let Some(change) = queues[user].next() {
                    order.push((format!("user{}", user + 1), change.clone()));
                    remaining -= 1;
                }
            }
            order
        };

        let first = interleaving(&mut rng);
        let second = interleaving(&mut rng);

        let mut client1 = SharedString::from_string(initial);
        let mut client2 = SharedString::from_string(initial);
        let mut server = SharedString::from_string(initial);

        let rebased: Vec<Change> = first
            .iter()
            .map(|(branch, change)| client1.apply_change(change, branch))
            .collect();
        for (branch, change) in &second {
            client2.apply_change(change, branch);
        }
        for change in &rebased {
            server.apply_change(change, "merged");
        }

        assert_eq!(client1.to_delta(), client2.to_delta());
        assert_eq!(client1.to_delta(), server.to_delta());
    }
}
