//! Engine-level behaviour of the parallel validator

use blogcheck::parallel::{ParallelValidator, Verdict};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_mixed_outcomes_are_aggregated() {
    let mut validator = ParallelValidator::new(3);
    validator.add_validator("c", || Err(anyhow::anyhow!("boom"))).unwrap();
    validator.add_validator("a", || Ok(Verdict::pass("ok"))).unwrap();
    validator.add_validator("b", || Ok(Verdict::fail("bad"))).unwrap();

    let (all_passed, results) = validator.run_all().unwrap();

    assert!(!all_passed);
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(
        results.iter().map(|r| (r.success, r.message.as_str())).collect::<Vec<_>>(),
        vec![(true, "ok"), (false, "bad"), (false, "Exception: boom")]
    );
}

#[test]
fn test_sleeping_validators_overlap() {
    let sleep = Duration::from_millis(200);
    let mut validator = ParallelValidator::new(6);
    for i in 0..7 {
        validator
            .add_validator(format!("sleep-{i}"), move || {
                thread::sleep(sleep);
                Ok(Verdict::pass("done"))
            })
            .unwrap();
    }

    let started = Instant::now();
    let report = validator.run().unwrap();
    let elapsed = started.elapsed();

    assert!(report.all_passed());
    assert_eq!(report.results().len(), 7);
    // Seven sleeps on six workers need two rounds, far less than the serial seven
    assert!(elapsed >= sleep * 2, "finished too fast: {elapsed:?}");
    assert!(elapsed < sleep * 5, "no overlap: {elapsed:?}");
    assert!(report.serial_equivalent() >= sleep * 7);
    assert!(report.speedup() > 1.5);
}

#[test]
fn test_all_passed_matches_every_result() {
    for failing in [0usize, 1, 4] {
        let mut validator = ParallelValidator::new(4);
        for i in 0..6 {
            let success = i >= failing;
            validator
                .add_validator(format!("v{i}"), move || Ok(Verdict::from((success, "checked"))))
                .unwrap();
        }
        let (all_passed, results) = validator.run_all().unwrap();
        assert_eq!(results.len(), 6);
        assert_eq!(all_passed, results.iter().all(|r| r.success));
        assert_eq!(results.iter().filter(|r| !r.success).count(), failing);
    }
}

#[test]
fn test_order_is_independent_of_completion() {
    let mut validator = ParallelValidator::new(4);
    // Later names finish first
    for (i, name) in ["delta", "alpha", "charlie", "bravo"].into_iter().enumerate() {
        let delay = Duration::from_millis(10 * (4 - i as u64));
        validator
            .add_validator(name, move || {
                thread::sleep(delay);
                Ok(Verdict::pass(name))
            })
            .unwrap();
    }

    for _ in 0..3 {
        let (_, results) = validator.run_all().unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie", "delta"]);
    }
}

#[test]
fn test_panic_is_isolated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut validator = ParallelValidator::new(2);
    validator
        .add_validator("explodes", || -> anyhow::Result<Verdict> { panic!("index out of range") })
        .unwrap();
    for name in ["fine-1", "fine-2", "fine-3"] {
        let calls = calls.clone();
        validator
            .add_validator(name, move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::pass("fine"))
            })
            .unwrap();
    }

    let (all_passed, results) = validator.run_all().unwrap();
    assert!(!all_passed);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(results[0].name, "explodes");
    assert_eq!(results[0].message, "Exception: index out of range");
    assert!(results[1..].iter().all(|r| r.success));
}

#[test]
fn test_timeout_does_not_hold_back_the_batch() {
    let mut validator =
        ParallelValidator::new(2).with_task_timeout(Some(Duration::from_millis(100)));
    validator
        .add_validator("hangs", || {
            thread::sleep(Duration::from_secs(5));
            Ok(Verdict::pass("late"))
        })
        .unwrap();
    for i in 0..4 {
        validator
            .add_validator(format!("quick-{i}"), || Ok(Verdict::pass("quick")))
            .unwrap();
    }

    let started = Instant::now();
    let (all_passed, results) = validator.run_all().unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!all_passed);
    let hung = results.iter().find(|r| r.name == "hangs").unwrap();
    assert!(!hung.success);
    assert!(hung.message.starts_with("Timed out after"), "{}", hung.message);
    assert_eq!(results.iter().filter(|r| r.success).count(), 4);
}

#[test]
fn test_empty_registry_passes() {
    let (all_passed, results) = ParallelValidator::new(4).run_all().unwrap();
    assert!(all_passed);
    assert!(results.is_empty());
}
