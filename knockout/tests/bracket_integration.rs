//! Integration tests for the bracket engine
//!
//! These tests drive complete tournaments through the in-memory store, from
//! registration through the final and the third-place match.

use knockout::bracket::{
    BracketError, BracketManager, BracketSlot, Draw, FINAL_ROUND, Group, SlotFilter, SlotState,
    SlotUpdate, THIRD_PLACE_ROUND, Tournament, TournamentFilter, first_round_number,
};
use knockout::bracket::plan::expected_structural_byes;
use knockout::db::{BracketStore, MemoryBracketStore, StoreTx};
use std::collections::HashSet;
use std::sync::Arc;

fn manager() -> (BracketManager, Arc<MemoryBracketStore>) {
    let store = Arc::new(MemoryBracketStore::new());
    let manager = BracketManager::with_draw(store.clone(), Draw::ordered());
    (manager, store)
}

async fn tournament_with(manager: &BracketManager, competitors: usize) -> Tournament {
    let tournament = manager
        .create_tournament(&format!("Open {competitors}"))
        .await
        .unwrap();
    for i in 0..competitors {
        manager
            .register_competitor(tournament.id, &format!("Player {i}"))
            .await
            .unwrap();
    }
    tournament
}

fn count_round(slots: &[BracketSlot], round: i32) -> usize {
    slots.iter().filter(|s| s.round == round).count()
}

fn next_playable(slots: &[BracketSlot]) -> Option<&BracketSlot> {
    slots
        .iter()
        .find(|s| !s.is_bye && s.state() == SlotState::Ready)
}

/// Play every match, seat A always winning, until nothing is playable.
async fn play_out(manager: &BracketManager, tournament_id: i64) -> usize {
    let mut played = 0;
    loop {
        let slots = manager.bracket(tournament_id).await.unwrap();
        let Some(slot) = next_playable(&slots) else {
            return played;
        };
        manager
            .record_result(slot.id, tournament_id, 2, 1)
            .await
            .unwrap();
        played += 1;
    }
}

#[tokio::test]
async fn test_sixteen_competitor_shape() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 16).await;

    let slots = manager.generate_bracket(tournament.id).await.unwrap();

    assert_eq!(first_round_number(16), 4);
    assert_eq!(count_round(&slots, 4), 8);
    assert_eq!(count_round(&slots, 3), 4);
    assert_eq!(count_round(&slots, 2), 2);
    assert_eq!(count_round(&slots, FINAL_ROUND), 1);
    assert_eq!(count_round(&slots, THIRD_PLACE_ROUND), 1);
    assert_eq!(slots.len(), 16);
    assert!(slots.iter().all(|s| !s.is_bye));

    // Presentation order starts with the first round
    assert_eq!(slots[0].round, 4);
    assert_eq!(slots.last().unwrap().round, THIRD_PLACE_ROUND);
}

#[tokio::test]
async fn test_twenty_competitor_shape() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 20).await;

    let slots = manager.generate_bracket(tournament.id).await.unwrap();

    assert_eq!(count_round(&slots, 5), 10);
    assert_eq!(count_round(&slots, 4), 6);
    assert_eq!(count_round(&slots, 3), 4);
    assert_eq!(count_round(&slots, 2), 2);
    assert_eq!(count_round(&slots, FINAL_ROUND), 1);
    assert_eq!(count_round(&slots, THIRD_PLACE_ROUND), 1);

    let byes = slots.iter().filter(|s| s.is_bye).count();
    assert_eq!(byes, expected_structural_byes(20));
    assert_eq!(byes, 4);

    // One structural bye per group in rounds 4 and 3
    for round in [4, 3] {
        for group in [Group::A, Group::B] {
            let in_round = slots
                .iter()
                .filter(|s| s.round == round && s.group == group && s.is_bye)
                .count();
            assert_eq!(in_round, 1, "round {round} group {group}");
        }
    }
}

#[tokio::test]
async fn test_generation_is_not_repeatable() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 8).await;

    manager.generate_bracket(tournament.id).await.unwrap();
    let result = manager.generate_bracket(tournament.id).await;

    assert!(matches!(
        result,
        Err(BracketError::TournamentAlreadyBracketed(id)) if id == tournament.id
    ));

    // The get-or-generate path returns the existing bracket unchanged
    let slots = manager.bracket(tournament.id).await.unwrap();
    assert_eq!(slots.len(), 8);
}

#[tokio::test]
async fn test_first_read_reports_build() {
    for n in [2, 3, 5, 12, 20, 33] {
        let (manager, _) = manager();
        let tournament = tournament_with(&manager, n).await;

        let view = manager.open_bracket(tournament.id).await.unwrap();
        let built = view.built.expect("first read builds the bracket");
        assert_eq!(built.competitors, n);
        assert_eq!(built.first_round, first_round_number(n));
        assert_eq!(built.structural_byes, expected_structural_byes(n), "n = {n}");
        assert_eq!(built.slot_count, view.slots.len());

        let again = manager.open_bracket(tournament.id).await.unwrap();
        assert!(again.built.is_none());
        assert_eq!(again.slots.len(), view.slots.len());
    }
}

#[tokio::test]
async fn test_concurrent_first_reads_build_once() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 6).await;

    let (first, second) = tokio::join!(
        manager.open_bracket(tournament.id),
        manager.open_bracket(tournament.id),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(
        usize::from(first.built.is_some()) + usize::from(second.built.is_some()),
        1
    );
    let ids = |slots: &[BracketSlot]| slots.iter().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids(&first.slots), ids(&second.slots));
}

#[tokio::test]
async fn test_generation_requires_two_competitors() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 1).await;

    let result = manager.generate_bracket(tournament.id).await;
    assert!(matches!(
        result,
        Err(BracketError::InsufficientCompetitors {
            needed: 2,
            current: 1
        })
    ));

    // Nothing was written
    let tournament = manager.get_tournament(tournament.id).await.unwrap();
    assert!(!tournament.is_bracketed);
}

#[tokio::test]
async fn test_unknown_tournament() {
    let (manager, _) = manager();

    assert!(matches!(
        manager.generate_bracket(404).await,
        Err(BracketError::TournamentNotFound(404))
    ));
    assert!(matches!(
        manager.register_competitor(404, "Ghost").await,
        Err(BracketError::TournamentNotFound(404))
    ));
    assert!(matches!(
        manager.list_competitors(404).await,
        Err(BracketError::TournamentNotFound(404))
    ));
}

#[tokio::test]
async fn test_registration_closes_once_bracketed() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 4).await;
    manager.generate_bracket(tournament.id).await.unwrap();

    let result = manager.register_competitor(tournament.id, "Late").await;
    assert!(matches!(
        result,
        Err(BracketError::TournamentAlreadyBracketed(_))
    ));

    let competitors = manager.list_competitors(tournament.id).await.unwrap();
    assert_eq!(competitors.len(), 4);
    let tournament = manager.get_tournament(tournament.id).await.unwrap();
    assert_eq!(tournament.competitor_count, 4);
}

#[tokio::test]
async fn test_result_validation() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 8).await;
    let other = tournament_with(&manager, 2).await;
    let slots = manager.bracket(tournament.id).await.unwrap();

    let playable = next_playable(&slots).unwrap().clone();
    let waiting = slots.iter().find(|s| s.round == 2).unwrap().clone();

    assert!(matches!(
        manager.record_result(9_999, tournament.id, 1, 0).await,
        Err(BracketError::SlotNotFound(9_999))
    ));
    assert!(matches!(
        manager.record_result(playable.id, other.id, 1, 0).await,
        Err(BracketError::SlotTournamentMismatch { .. })
    ));
    assert!(matches!(
        manager.record_result(waiting.id, tournament.id, 1, 0).await,
        Err(BracketError::SlotNotReady(_))
    ));
    assert!(matches!(
        manager.record_result(playable.id, tournament.id, 1, 1).await,
        Err(BracketError::InvalidScore { .. })
    ));

    let decided = manager
        .record_result(playable.id, tournament.id, 0, 3)
        .await
        .unwrap();
    assert_eq!(decided.winner, playable.competitor_b);
    assert_eq!(decided.score_a, Some(0));
    assert_eq!(decided.score_b, Some(3));

    assert!(matches!(
        manager.record_result(playable.id, tournament.id, 3, 0).await,
        Err(BracketError::ResultAlreadyRecorded(_))
    ));
}

#[tokio::test]
async fn test_winner_advances_within_group() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 8).await;
    let slots = manager.bracket(tournament.id).await.unwrap();

    let first: Vec<BracketSlot> = slots
        .iter()
        .filter(|s| s.round == 3 && s.group == Group::B)
        .cloned()
        .collect();
    assert_eq!(first.len(), 2);

    for slot in &first {
        manager
            .record_result(slot.id, tournament.id, 5, 2)
            .await
            .unwrap();
    }

    let slots = manager.bracket(tournament.id).await.unwrap();
    let semifinal = slots
        .iter()
        .find(|s| s.round == 2 && s.group == Group::B)
        .unwrap();
    let advanced: HashSet<_> = [semifinal.competitor_a, semifinal.competitor_b]
        .into_iter()
        .collect();
    let expected: HashSet<_> = first.iter().map(|s| s.competitor_a).collect();
    assert_eq!(advanced, expected);
    assert_eq!(semifinal.state(), SlotState::Ready);

    // Group A is untouched
    let other = slots
        .iter()
        .find(|s| s.round == 2 && s.group == Group::A)
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_semifinals_feed_final_and_third_place() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 4).await;
    let slots = manager.bracket(tournament.id).await.unwrap();

    let semi_a = slots
        .iter()
        .find(|s| s.round == 2 && s.group == Group::A)
        .unwrap()
        .clone();
    let semi_b = slots
        .iter()
        .find(|s| s.round == 2 && s.group == Group::B)
        .unwrap()
        .clone();

    manager
        .record_result(semi_a.id, tournament.id, 3, 0)
        .await
        .unwrap();
    manager
        .record_result(semi_b.id, tournament.id, 0, 3)
        .await
        .unwrap();

    let slots = manager.bracket(tournament.id).await.unwrap();
    let final_slot = slots.iter().find(|s| s.round == FINAL_ROUND).unwrap();
    let third_place = slots.iter().find(|s| s.round == THIRD_PLACE_ROUND).unwrap();

    // Group A holds seat A, group B seat B
    assert_eq!(final_slot.competitor_a, semi_a.competitor_a);
    assert_eq!(final_slot.competitor_b, semi_b.competitor_b);
    assert_eq!(third_place.competitor_a, semi_a.competitor_b);
    assert_eq!(third_place.competitor_b, semi_b.competitor_a);
    assert_eq!(final_slot.group, Group::F);
    assert_eq!(final_slot.round_label().to_string(), "Final");
    assert_eq!(third_place.round_label().to_string(), "Third place");
}

#[tokio::test]
async fn test_standings_lifecycle() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 4).await;

    assert!(matches!(
        manager.standings(tournament.id).await,
        Err(BracketError::TournamentNotBracketed(_))
    ));

    manager.bracket(tournament.id).await.unwrap();
    assert!(matches!(
        manager.standings(tournament.id).await,
        Err(BracketError::StandingsPending(_))
    ));

    assert_eq!(play_out(&manager, tournament.id).await, 4);

    let standings = manager.standings(tournament.id).await.unwrap();
    let names: Vec<String> = [
        &standings.champion,
        &standings.runner_up,
        &standings.third,
        &standings.fourth,
    ]
    .into_iter()
    .map(|c| c.as_ref().unwrap().name.clone())
    .collect();

    // Registration order splits groups as [0, 1] and [2, 3]; seat A always wins
    assert_eq!(names, ["Player 0", "Player 2", "Player 1", "Player 3"]);

    let tournament = manager.get_tournament(tournament.id).await.unwrap();
    assert!(tournament.is_finalized);
}

#[tokio::test]
async fn test_two_competitors_play_only_the_final() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 2).await;

    let slots = manager.bracket(tournament.id).await.unwrap();
    assert_eq!(slots.len(), 2);
    let final_slot = slots.iter().find(|s| s.round == FINAL_ROUND).unwrap();
    assert!(final_slot.is_ready());

    assert_eq!(play_out(&manager, tournament.id).await, 1);

    let standings = manager.standings(tournament.id).await.unwrap();
    assert!(standings.champion.is_some());
    assert!(standings.runner_up.is_some());
    assert!(standings.third.is_none());
    assert!(manager.get_tournament(tournament.id).await.unwrap().is_finalized);
}

#[tokio::test]
async fn test_round_trip_for_every_size() {
    for n in 2..=33 {
        let (manager, _) = manager();
        let tournament = tournament_with(&manager, n).await;

        let played = play_out(&manager, tournament.id).await;
        let slots = manager.bracket(tournament.id).await.unwrap();

        // A knockout eliminates n - 1 competitors, plus the third-place match
        // when both semifinal losers exist
        let third_place = slots
            .iter()
            .find(|s| s.round == THIRD_PLACE_ROUND)
            .unwrap();
        let third_played = usize::from(!third_place.is_bye);
        assert_eq!(played, n - 1 + third_played, "n = {n}");

        assert!(
            slots.iter().all(|s| matches!(
                s.state(),
                SlotState::Decided | SlotState::ByeDecided | SlotState::Empty
            )),
            "n = {n}: slot left seated or ready"
        );
        for slot in slots.iter().filter(|s| s.is_bye) {
            assert!(!slot.is_ready(), "n = {n}: bye slot {} is full", slot.id);
            assert!(slot.score_a.is_none() && slot.score_b.is_none());
        }

        let final_slot = slots.iter().find(|s| s.round == FINAL_ROUND).unwrap();
        assert!(final_slot.winner.is_some(), "n = {n}");
        if n > 2 {
            assert!(third_place.winner.is_some(), "n = {n}");
        }

        let tournament = manager.get_tournament(tournament.id).await.unwrap();
        assert!(tournament.is_finalized, "n = {n}");
        assert!(manager.standings(tournament.id).await.unwrap().champion.is_some());
    }
}

#[tokio::test]
async fn test_seeded_draws_finish() {
    for seed in 0..8 {
        let store = Arc::new(MemoryBracketStore::new());
        let manager = BracketManager::with_draw(store, Draw::seeded(seed));
        let tournament = tournament_with(&manager, 13).await;

        play_out(&manager, tournament.id).await;

        let tournament = manager.get_tournament(tournament.id).await.unwrap();
        assert!(tournament.is_finalized, "seed = {seed}");
    }
}

#[tokio::test]
async fn test_resolve_byes_is_idempotent() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 6).await;
    manager.generate_bracket(tournament.id).await.unwrap();

    let first = manager.resolve_byes(tournament.id).await.unwrap();
    assert!(!first.is_empty());
    assert!(first.iter().any(|s| s.is_bye && s.bye_resolved));

    let second = manager.resolve_byes(tournament.id).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_concurrent_double_submit() {
    let (manager, _) = manager();
    let tournament = tournament_with(&manager, 8).await;
    let slots = manager.bracket(tournament.id).await.unwrap();
    let slot = next_playable(&slots).unwrap().clone();

    let (first, second) = tokio::join!(
        manager.record_result(slot.id, tournament.id, 2, 0),
        manager.record_result(slot.id, tournament.id, 0, 2),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(BracketError::ResultAlreadyRecorded(_))))
    );
}

#[tokio::test]
async fn test_invariant_violation_rolls_back() {
    let (manager, store) = manager();
    let tournament = tournament_with(&manager, 4).await;
    let slots = manager.bracket(tournament.id).await.unwrap();

    let semifinal = slots
        .iter()
        .find(|s| s.round == 2 && s.group == Group::A)
        .unwrap()
        .clone();
    let final_slot = slots.iter().find(|s| s.round == FINAL_ROUND).unwrap().clone();

    // Occupy group A's final seat behind the engine's back
    let mut tx = store.begin().await.unwrap();
    tx.update_slot(final_slot.id, &SlotUpdate::seat(knockout::bracket::Seat::A, 9_999))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let result = manager.record_result(semifinal.id, tournament.id, 1, 0).await;
    let err = result.unwrap_err();
    assert!(matches!(err, BracketError::BracketInvariantViolation(_)));
    assert!(err.is_fatal());

    // The result itself was not kept
    let mut tx = store.begin().await.unwrap();
    let semifinal = tx.get_slot(semifinal.id).await.unwrap().unwrap();
    assert!(semifinal.winner.is_none());
    assert!(semifinal.score_a.is_none());
    let third = tx
        .find_slots(tournament.id, &SlotFilter::round(THIRD_PLACE_ROUND))
        .await
        .unwrap();
    assert!(third[0].is_empty());
}

#[tokio::test]
async fn test_search_tournaments() {
    let (manager, _) = manager();
    let spring = manager.create_tournament("Spring Open").await.unwrap();
    manager.create_tournament("Autumn Cup").await.unwrap();

    let by_name = manager
        .search_tournaments(&TournamentFilter {
            id: None,
            name: Some("OPEN".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(by_name, vec![spring.clone()]);

    let by_id = manager
        .search_tournaments(&TournamentFilter {
            id: Some(spring.id),
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(by_id, vec![spring]);

    let all = manager
        .search_tournaments(&TournamentFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    assert!(matches!(
        manager
            .search_tournaments(&TournamentFilter {
                id: Some(777),
                name: None
            })
            .await,
        Err(BracketError::TournamentNotFound(777))
    ));
}
