//! Property tests for allocation, skipping and scoring.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use matchscan_core::allocation::{AllocationController, Replacement, Selection};
use matchscan_core::bank::{BankCategory, QuestionBank};
use matchscan_core::error::AllocationError;
use matchscan_core::model::{Origin, QuestionKey, Rating};
use matchscan_core::record::finish;
use matchscan_core::scoring::{Band, BandTable, Compatibility, ScoringEngine};
use matchscan_core::session::ItemState;

fn make_bank(categories: usize, per_category: usize) -> QuestionBank {
    let categories = (0..categories)
        .map(|c| {
            let id = format!("cat{c}");
            let questions = (0..per_category)
                .map(|q| format!("{id} question {q}"))
                .collect();
            BankCategory::new(id.as_str(), id.to_uppercase(), "", questions)
        })
        .collect();
    QuestionBank::new("prop", "Prop", "1", categories).unwrap()
}

fn arb_rating() -> impl Strategy<Value = Rating> {
    prop::sample::select(Rating::ALL.to_vec())
}

/// Bank shape, a target that fits in it, and up to `target` distinct explicit
/// picks in arbitrary order.
fn arb_plan() -> impl Strategy<Value = (usize, usize, usize, Vec<QuestionKey>)> {
    (2usize..6, 2usize..9)
        .prop_flat_map(|(cats, per)| {
            let total = cats * per;
            (
                Just(cats),
                Just(per),
                1..=total,
                prop::collection::btree_set((0..cats, 0..per), 0..=total.min(6))
                    .prop_map(|picks| picks.into_iter().collect::<Vec<_>>())
                    .prop_shuffle(),
            )
        })
        .prop_filter("explicit picks fit the target", |(_, _, target, picks)| {
            picks.len() <= *target
        })
        .prop_map(|(cats, per, target, picks)| {
            let keys = picks
                .into_iter()
                .map(|(c, q)| QuestionKey::new(format!("cat{c}"), q))
                .collect();
            (cats, per, target, keys)
        })
}

#[derive(Debug, Clone)]
enum Step {
    Answer(Rating),
    Skip,
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        prop_oneof![
            3 => arb_rating().prop_map(Step::Answer),
            2 => Just(Step::Skip),
        ],
        0..80,
    )
}

proptest! {
    #[test]
    fn initialize_fills_target_without_repeats((cats, per, target, keys) in arb_plan()) {
        let bank = make_bank(cats, per);
        let controller = AllocationController::new(&bank);
        let selection = Selection::from_keys(keys.clone());
        let session = controller.initialize(&selection, target).unwrap();

        prop_assert_eq!(session.queue().len(), target);
        let unique: HashSet<_> = session.queue().iter().map(|i| &i.key).collect();
        prop_assert_eq!(unique.len(), target);

        let head: Vec<QuestionKey> = session.queue()[..keys.len()]
            .iter()
            .map(|i| i.key.clone())
            .collect();
        prop_assert_eq!(&head, &keys);
        let (user, system) = session.queue().split_at(keys.len());
        prop_assert!(user.iter().all(|i| i.origin == Origin::UserSelected));
        prop_assert!(system.iter().all(|i| i.origin == Origin::SystemSelected));

        let threshold = target.div_ceil(2);
        if keys.len() < threshold {
            prop_assert!(session.system_selected_count() >= threshold);
        }
        prop_assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn skips_preserve_invariants(
        (cats, per, target, keys) in arb_plan(),
        steps in arb_steps(),
    ) {
        let bank = make_bank(cats, per);
        let controller = AllocationController::new(&bank);
        let selection = Selection::from_keys(keys);
        let mut session = controller.initialize(&selection, target).unwrap();
        let mut skipped: BTreeSet<QuestionKey> = BTreeSet::new();

        for step in steps {
            let Some(current) = session.current().map(|i| i.key.clone()) else {
                break;
            };
            match step {
                Step::Answer(rating) => {
                    session.record_answer(&current, rating, None).unwrap();
                }
                Step::Skip => {
                    let outcome = controller.replace(&mut session, &current).unwrap();
                    if let Replacement::Replaced(item) = &outcome {
                        prop_assert!(!skipped.contains(&item.key));
                        prop_assert_eq!(item.origin, Origin::SystemSelected);
                    }
                    skipped.insert(current.clone());

                    let again = controller.replace(&mut session, &current);
                    let rejected = matches!(again, Err(AllocationError::InvalidSkipTarget { .. }));
                    prop_assert!(rejected);
                }
            }
            prop_assert!(session.check_invariants().is_ok());
        }

        for key in &skipped {
            prop_assert_eq!(session.state_of(key), Some(ItemState::Skipped));
            prop_assert!(session.answers().iter().all(|a| &a.key != key));
        }
        prop_assert_eq!(
            session.queue().len() + session.unresolved_skips(),
            target + skipped.len()
        );
        prop_assert!(session.progress().answered_count <= target);
    }

    #[test]
    fn finished_score_ignores_skipped_items(
        ratings in prop::collection::vec(arb_rating(), 1..15),
        skips in prop::collection::vec(any::<bool>(), 15),
    ) {
        let bank = make_bank(6, 8);
        let controller = AllocationController::new(&bank);
        let mut session = controller.initialize(&Selection::new(), 15).unwrap();
        let engine = ScoringEngine::default();

        let mut answered = Vec::new();
        for (rating, skip) in ratings.iter().zip(skips) {
            let Some(current) = session.current().map(|i| i.key.clone()) else {
                break;
            };
            if skip {
                controller.replace(&mut session, &current).unwrap();
            }
            let Some(current) = session.current().map(|i| i.key.clone()) else {
                break;
            };
            session.record_answer(&current, *rating, None).unwrap();
            answered.push(*rating);
        }
        prop_assume!(!answered.is_empty());

        let finished = finish(&session, &engine, "Sam", "date").unwrap();
        let expected = engine.score(answered.clone()).unwrap();
        prop_assert_eq!(finished.record.score, expected);
        prop_assert_eq!(finished.record.answers.len(), answered.len());
        let tallied: usize = finished.breakdown.values().map(|c| c.total()).sum();
        prop_assert_eq!(tallied, answered.len());
    }

    #[test]
    fn raising_one_rating_never_lowers_score(
        ratings in prop::collection::vec(arb_rating(), 1..30),
        pick in any::<prop::sample::Index>(),
    ) {
        let engine = ScoringEngine::default();
        let before = engine.score(ratings.clone()).unwrap();
        let i = pick.index(ratings.len());
        if let Some(better) = engine.scale().raise(ratings[i]) {
            let mut raised = ratings.clone();
            raised[i] = better;
            prop_assert!(engine.score(raised).unwrap() >= before);
        }
        prop_assert!(before <= 100);
    }

    #[test]
    fn valid_band_tables_cover_every_score(mins in prop::collection::btree_set(1u8..=100, 4)) {
        let mins: Vec<u8> = mins.into_iter().rev().chain(std::iter::once(0)).collect();
        let bands = Compatibility::ALL
            .iter()
            .zip(&mins)
            .map(|(&category, &min)| Band { category, min })
            .collect();
        let table = BandTable::new(bands).unwrap();

        let mut last = Compatibility::HighPotential;
        for score in (0..=100u8).rev() {
            let category = table.classify(score).unwrap();
            prop_assert!(table.range_of(category).contains(&score));
            prop_assert!(category >= last);
            last = category;
        }
    }
}

#[test]
fn default_bands_partition_the_range() {
    let engine = ScoringEngine::default();
    let counts = Compatibility::ALL.map(|category| engine.bands().range_of(category).count());
    assert_eq!(counts.iter().sum::<usize>(), 101);
    assert!(engine.classify(101).is_err());
}
