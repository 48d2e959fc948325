// tests/engine.rs
use anyhow::Result;
use hotel_reviews_etl::keys::SequenceKeys;
use hotel_reviews_etl::*;
use std::sync::Arc;

fn sorted<T: Ord>(mut v: Vec<T>) -> Vec<T> {
    v.sort();
    v
}

#[test]
fn stateless_chain_seq_par() -> Result<()> {
    let p = Pipeline::default();
    let out = from_vec(&p, (1..=20).collect::<Vec<i32>>())
        .filter(|x: &i32| x % 2 == 0)
        .map(|x: &i32| x * 10);

    let seq = out.clone().collect_seq()?;
    let par = out.collect_par(Some(2), Some(4))?;
    assert_eq!(seq.len(), 10);
    assert_eq!(&seq[..3], &[20, 40, 60]);
    // partitions are contiguous and concatenated in order
    assert_eq!(par, seq);
    Ok(())
}

#[test]
fn try_map_surfaces_the_first_error() {
    let p = Pipeline::default();
    let err = from_vec(&p, vec!["1".to_string(), "x".to_string()])
        .try_map(|s: &String| Ok(s.parse::<i32>()?))
        .collect_seq()
        .unwrap_err();
    assert!(format!("{err:#}").contains("invalid digit"));
}

#[test]
fn distinct_keeps_first_occurrences() -> Result<()> {
    let p = Pipeline::default();
    let data = vec!["b", "a", "b", "c", "a"]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    let seq = from_vec(&p, data.clone()).distinct().collect_seq()?;
    assert_eq!(seq, vec!["b", "a", "c"]);

    let par = from_vec(&p, data).distinct().collect_par(None, Some(3))?;
    assert_eq!(sorted(par), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn join_left_keeps_unmatched_rows() -> Result<()> {
    let p = Pipeline::default();
    let left = from_vec(
        &p,
        vec![
            (1u32, "L1".to_string()),
            (2, "L2".to_string()),
            (1, "L1b".to_string()),
        ],
    );
    let right = from_vec(&p, vec![(1u32, 100i64), (3, 300)]);

    let joined = left.join_left(&right);
    let seq = joined.clone().collect_seq()?;
    let par = sorted(joined.collect_par(None, None)?);

    assert_eq!(
        seq,
        vec![
            (1, ("L1".to_string(), Some(100))),
            (2, ("L2".to_string(), None)),
            (1, ("L1b".to_string(), Some(100))),
        ]
    );
    assert_eq!(par, sorted(seq));
    Ok(())
}

#[test]
fn joins_chain_and_continue() -> Result<()> {
    let p = Pipeline::default();
    let reviews = from_vec(&p, vec![("arena".to_string(), "Russia".to_string())]);
    let hotels = from_vec(&p, vec![("arena".to_string(), 7i64)]);
    let reviewers = from_vec(&p, vec![("Russia".to_string(), 9i64)]);

    let out = reviews
        .join_left(&hotels)
        .map(|(_, (nat, h))| (nat.clone(), *h))
        .join_left(&reviewers)
        .map(|(_, ids)| *ids)
        .collect_par(Some(2), None)?;
    assert_eq!(out, vec![(Some(7), Some(9))]);
    Ok(())
}

#[test]
fn materialize_freezes_sequence_keys() -> Result<()> {
    let p = Pipeline::default();
    let keys: Arc<dyn SurrogateKeys<String>> = Arc::new(SequenceKeys::default());
    let keyed = from_vec(&p, vec!["x".to_string(), "y".to_string()])
        .assign_keys(keys, |id, s: &String| (s.clone(), id))
        .materialize(&Runner::new(ExecMode::Sequential))?;

    // Reading a materialized collection twice yields identical keys.
    let first = keyed.clone().collect_seq()?;
    let second = keyed.collect_seq()?;
    assert_eq!(first, vec![("x".to_string(), 0), ("y".to_string(), 1)]);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn content_hash_keys_do_not_depend_on_mode() -> Result<()> {
    let p = Pipeline::default();
    let data: Vec<String> = (0..50).map(|i| format!("hotel-{i}")).collect();
    let build = |runner: &Runner| -> Result<Vec<(String, i64)>> {
        from_vec(&p, data.clone())
            .assign_keys(KeyStrategy::ContentHash.generator(), |id, s: &String| {
                (s.clone(), id)
            })
            .collect_with(runner)
    };
    let seq = sorted(build(&Runner::new(ExecMode::Sequential))?);
    let par = sorted(build(&Runner::default())?);
    assert_eq!(seq, par);
    Ok(())
}

#[test]
fn pipeline_counts_nodes() {
    let p = Pipeline::default();
    let _ = from_vec(&p, vec![1u8]).map(|x: &u8| *x);
    assert_eq!(p.node_count(), 2);
}
