use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, TimeZone, Utc};

use super::*;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, hour, 0, 0).unwrap()
}

fn item(id: &str, rank: u32, read_count: u64, collect_count: u64) -> ItemRecord {
    ItemRecord {
        platform: "reelshort".to_string(),
        item_id: id.to_string(),
        title: format!("Drama {id}"),
        rank,
        read_count,
        collect_count,
        genres: BTreeSet::from(["Romance".to_string()]),
        captured_at: at(0),
        description: None,
        episode_count: None,
        like_count: None,
        score: None,
        cover_url: None,
    }
}

fn snapshot(hour: u32, items: Vec<ItemRecord>) -> Snapshot {
    Snapshot {
        platform: "reelshort".to_string(),
        captured_at: at(hour),
        sequence: i64::from(hour),
        items,
    }
}

fn wide() -> ChangeAnalyzer {
    ChangeAnalyzer::new(AnalyzerConfig {
        report_max_items: 1_000,
        ..AnalyzerConfig::default()
    })
}

fn ids<T>(entries: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    entries.iter().map(|e| id(e).to_string()).collect()
}

#[test]
fn scenario_rank_and_read_count_surge() {
    let previous = snapshot(1, vec![item("A", 18, 145_900_000, 1_000)]);
    let current = snapshot(2, vec![item("A", 3, 270_400_000, 1_000)]);

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(result.rank_surges.len(), 1);
    assert_eq!(result.rank_surges[0].item_id, "A");
    assert_eq!(result.rank_surges[0].rank_delta, 15);
    assert_eq!(result.rank_surges[0].previous_rank, 18);
    assert_eq!(result.rank_surges[0].current_rank, 3);

    assert_eq!(result.read_count_surges.len(), 1);
    let pct = result.read_count_surges[0].growth.percent().unwrap();
    assert!((pct - 85.33).abs() < 0.01, "got {pct}");
    assert_eq!(result.read_count_surges[0].previous_value, 145_900_000);
    assert_eq!(result.read_count_surges[0].current_value, 270_400_000);

    assert!(result.rank_drops.is_empty());
    assert!(result.collect_surges.is_empty());
}

#[test]
fn scenario_dropped_entry() {
    let previous = snapshot(1, vec![item("A", 1, 10, 1), item("B", 2, 10, 1)]);
    let current = snapshot(2, vec![item("A", 1, 10, 1)]);

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(result.dropped_entries.len(), 1);
    assert_eq!(result.dropped_entries[0].item_id, "B");
    assert_eq!(result.dropped_entries[0].previous_rank, 2);
    assert!(result.new_entries.is_empty());
}

#[test]
fn scenario_new_entry() {
    let previous = snapshot(1, vec![item("A", 1, 10, 1)]);
    let current = snapshot(2, vec![item("A", 1, 10, 1), item("C", 2, 5, 0)]);

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(result.new_entries.len(), 1);
    assert_eq!(result.new_entries[0].item_id, "C");
    assert_eq!(result.new_entries[0].current_rank, 2);
    assert!(result.dropped_entries.is_empty());
}

#[test]
fn rank_threshold_is_inclusive() {
    let previous = snapshot(
        1,
        vec![item("up10", 13, 1, 1), item("up9", 14, 1, 1), item("down10", 3, 1, 1)],
    );
    let current = snapshot(
        2,
        vec![item("up10", 3, 1, 1), item("up9", 5, 1, 1), item("down10", 13, 1, 1)],
    );

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(ids(&result.rank_surges, |c| &c.item_id), vec!["up10"]);
    assert_eq!(ids(&result.rank_drops, |c| &c.item_id), vec!["down10"]);
    assert_eq!(result.rank_drops[0].rank_delta, -10);
}

#[test]
fn zero_rank_thresholds_are_raised_to_one() {
    let analyzer = ChangeAnalyzer::new(AnalyzerConfig {
        rank_surge_threshold: 0,
        rank_drop_threshold: Some(0),
        ..AnalyzerConfig::default()
    });
    assert_eq!(analyzer.config().rank_surge_threshold, 1);
    assert_eq!(analyzer.config().rank_drop_threshold, Some(1));

    let previous = snapshot(
        1,
        vec![item("same", 1, 1, 1), item("up", 3, 1, 1), item("down", 2, 1, 1)],
    );
    let current = snapshot(
        2,
        vec![item("same", 1, 1, 1), item("up", 2, 1, 1), item("down", 3, 1, 1)],
    );

    let result = analyzer.analyze(&previous, &current);

    assert_eq!(ids(&result.rank_surges, |c| &c.item_id), vec!["up"]);
    assert_eq!(ids(&result.rank_drops, |c| &c.item_id), vec!["down"]);
}

#[test]
fn separate_drop_threshold_applies_to_drops_only() {
    let analyzer = ChangeAnalyzer::new(AnalyzerConfig {
        rank_drop_threshold: Some(3),
        ..AnalyzerConfig::default()
    });
    let previous = snapshot(1, vec![item("a", 1, 1, 1), item("b", 9, 1, 1)]);
    let current = snapshot(2, vec![item("b", 4, 1, 1), item("a", 5, 1, 1)]);

    let result = analyzer.analyze(&previous, &current);

    assert!(result.rank_surges.is_empty());
    assert_eq!(ids(&result.rank_drops, |c| &c.item_id), vec!["a"]);
}

#[test]
fn percentage_thresholds_are_inclusive() {
    let previous = snapshot(
        1,
        vec![item("exact", 1, 100, 100), item("below", 2, 100, 100)],
    );
    let current = snapshot(
        2,
        vec![item("exact", 1, 150, 130), item("below", 2, 149, 129)],
    );

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(ids(&result.read_count_surges, |s| &s.item_id), vec!["exact"]);
    assert_eq!(ids(&result.collect_surges, |s| &s.item_id), vec!["exact"]);
}

#[test]
fn zero_baseline_yields_new_sentinel() {
    let previous = snapshot(
        1,
        vec![
            item("from_zero", 1, 0, 0),
            item("still_zero", 2, 0, 0),
            item("doubled", 3, 100, 10),
        ],
    );
    let current = snapshot(
        2,
        vec![
            item("from_zero", 1, 5, 1),
            item("still_zero", 2, 0, 0),
            item("doubled", 3, 200, 20),
        ],
    );

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(
        ids(&result.read_count_surges, |s| &s.item_id),
        vec!["from_zero", "doubled"]
    );
    assert_eq!(result.read_count_surges[0].growth, Growth::New);
    assert_eq!(result.collect_surges[0].growth, Growth::New);
    assert_eq!(result.collect_surges[1].growth, Growth::Percent(100.0));
}

#[test]
fn ties_break_by_item_id() {
    let previous = snapshot(
        1,
        vec![item("b", 21, 1, 1), item("a", 22, 1, 1), item("c", 23, 1, 1)],
    );
    let current = snapshot(
        2,
        vec![item("b", 1, 1, 1), item("a", 2, 1, 1), item("c", 3, 1, 1)],
    );

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(ids(&result.rank_surges, |c| &c.item_id), vec!["a", "b", "c"]);
}

#[test]
fn truncates_to_largest_surges() {
    let previous = snapshot(
        1,
        (1..=25)
            .map(|k| item(&format!("item-{k:02}"), 10 + 2 * k, 1, 1))
            .collect(),
    );
    let current = snapshot(
        2,
        (1..=25)
            .map(|k| item(&format!("item-{k:02}"), k, 1, 1))
            .collect(),
    );

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(result.totals.rank_surges, 25);
    assert_eq!(result.rank_surges.len(), 10);
    let expected: Vec<String> = (16..=25).rev().map(|k| format!("item-{k:02}")).collect();
    assert_eq!(ids(&result.rank_surges, |c| &c.item_id), expected);
    assert_eq!(result.rank_surges[0].rank_delta, 35);
}

#[test]
fn new_and_dropped_entries_are_ordered_by_rank() {
    let previous = snapshot(
        1,
        vec![item("keep", 1, 1, 1), item("gone-b", 7, 1, 1), item("gone-a", 3, 1, 1)],
    );
    let current = snapshot(
        2,
        vec![item("keep", 1, 1, 1), item("new-b", 9, 1, 1), item("new-a", 2, 1, 1)],
    );

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(ids(&result.new_entries, |e| &e.item_id), vec!["new-a", "new-b"]);
    assert_eq!(
        ids(&result.dropped_entries, |e| &e.item_id),
        vec!["gone-a", "gone-b"]
    );
}

#[test]
fn empty_current_reports_only_dropped_entries() {
    let previous = snapshot(1, vec![item("a", 1, 10, 1), item("b", 2, 10, 1)]);
    let current = snapshot(2, Vec::new());

    let result = ChangeAnalyzer::default().analyze(&previous, &current);

    assert_eq!(result.dropped_entries.len(), 2);
    assert!(result.new_entries.is_empty());
    assert!(result.rank_surges.is_empty());
    assert!(result.rank_drops.is_empty());
    assert!(result.read_count_surges.is_empty());
    assert!(result.collect_surges.is_empty());
}

fn mixed_pair() -> (Snapshot, Snapshot) {
    let previous = snapshot(
        1,
        vec![
            item("a", 1, 100, 10),
            item("b", 2, 0, 5),
            item("c", 3, 500, 50),
            item("d", 4, 80, 8),
            item("e", 15, 60, 6),
            item("f", 20, 40, 4),
        ],
    );
    let current = snapshot(
        2,
        vec![
            item("e", 1, 300, 30),
            item("a", 2, 120, 10),
            item("g", 3, 10, 0),
            item("c", 14, 510, 50),
            item("b", 5, 3, 9),
            item("h", 6, 0, 0),
        ],
    );
    (previous, current)
}

#[test]
fn identical_inputs_give_identical_results() {
    let (previous, current) = mixed_pair();
    let analyzer = ChangeAnalyzer::default();

    let first = analyzer.analyze(&previous, &current);
    let second = analyzer.analyze(&previous, &current);
    assert_eq!(first, second);

    let mut shuffled = current.clone();
    shuffled.items.reverse();
    assert_eq!(analyzer.analyze(&previous, &shuffled), first);
}

#[test]
fn new_and_dropped_partition_the_symmetric_difference() {
    let (previous, current) = mixed_pair();
    let result = wide().analyze(&previous, &current);

    let previous_ids: HashSet<&str> = previous.items.iter().map(|i| i.item_id.as_str()).collect();
    let current_ids: HashSet<&str> = current.items.iter().map(|i| i.item_id.as_str()).collect();
    let new_ids: HashSet<&str> = result.new_entries.iter().map(|e| e.item_id.as_str()).collect();
    let dropped_ids: HashSet<&str> = result
        .dropped_entries
        .iter()
        .map(|e| e.item_id.as_str())
        .collect();

    let only_current: HashSet<&str> = current_ids.difference(&previous_ids).copied().collect();
    let only_previous: HashSet<&str> = previous_ids.difference(&current_ids).copied().collect();

    assert_eq!(new_ids, only_current);
    assert_eq!(dropped_ids, only_previous);
    assert!(new_ids.is_disjoint(&dropped_ids));
    for shared in previous_ids.intersection(&current_ids) {
        assert!(!new_ids.contains(shared));
        assert!(!dropped_ids.contains(shared));
    }
}

#[test]
fn no_item_is_both_surge_and_drop() {
    let (previous, current) = mixed_pair();
    let result = wide().analyze(&previous, &current);

    let surge_ids: HashSet<&str> = result.rank_surges.iter().map(|c| c.item_id.as_str()).collect();
    let drop_ids: HashSet<&str> = result.rank_drops.iter().map(|c| c.item_id.as_str()).collect();
    assert!(surge_ids.is_disjoint(&drop_ids));
    assert_eq!(surge_ids, HashSet::from(["e"]));
    assert_eq!(drop_ids, HashSet::from(["c"]));
}

#[test]
fn mixed_pair_metric_surges() {
    let (previous, current) = mixed_pair();
    let result = wide().analyze(&previous, &current);

    // e: 60 -> 300 (+400%), b: 0 -> 3 (new), a: 100 -> 120 (+20%, below).
    assert_eq!(ids(&result.read_count_surges, |s| &s.item_id), vec!["b", "e"]);
    // e: 6 -> 30 (+400%), b: 5 -> 9 (+80%).
    assert_eq!(ids(&result.collect_surges, |s| &s.item_id), vec!["e", "b"]);
    assert!(!result.is_stable());
}
