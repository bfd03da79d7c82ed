use cardbox_core::repo::card_repo::CardRepo;
use cardbox_core::{
    Card, CardQueue, CardType, Collection, Note, Notetype, NotetypeId, UndoState,
};

#[test]
fn review_undo_restores_the_exact_snapshot() {
    let mut col = open_col();
    let card = add_single_card(&mut col);

    col.mark_review(&card);
    answer(&mut col, &card, 3);

    let mutated = CardRepo::new(col.db()).get_card(card.id).unwrap().unwrap();
    assert_ne!(mutated, card);

    let undone = col.undo().unwrap();
    assert_eq!(undone, Some(card.id));

    let restored = CardRepo::new(col.db()).get_card(card.id).unwrap().unwrap();
    assert_eq!(restored, card);
    assert!(matches!(col.undo_state(), UndoState::Inactive));
}

#[test]
fn review_undo_trims_the_latest_log_entry() {
    let mut col = open_col();
    let card = add_single_card(&mut col);

    col.mark_review(&card);
    answer(&mut col, &card, 3);
    assert_eq!(review_count(&col, &card), 1);

    col.undo().unwrap();
    assert_eq!(review_count(&col, &card), 0);
}

#[test]
fn consecutive_reviews_stack_and_pop_in_order() {
    let mut col = open_col();
    let card = add_single_card(&mut col);

    col.mark_review(&card);
    answer(&mut col, &card, 2);
    let after_first = CardRepo::new(col.db()).get_card(card.id).unwrap().unwrap();

    col.mark_review(&after_first);
    answer(&mut col, &after_first, 4);

    assert_eq!(col.undo().unwrap(), Some(card.id));
    let restored = CardRepo::new(col.db()).get_card(card.id).unwrap().unwrap();
    assert_eq!(restored, after_first);
    assert!(matches!(col.undo_state(), UndoState::ReviewUndo(_)));

    assert_eq!(col.undo().unwrap(), Some(card.id));
    let restored = CardRepo::new(col.db()).get_card(card.id).unwrap().unwrap();
    assert_eq!(restored, card);
    assert!(matches!(col.undo_state(), UndoState::Inactive));
}

#[test]
fn undo_with_nothing_to_undo_is_a_noop() {
    let mut col = open_col();
    assert_eq!(col.undo().unwrap(), None);
}

#[test]
fn checkpoint_undo_rolls_back_to_the_last_save() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));
    col.save(Some("Setup"), None).unwrap();

    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();
    assert_eq!(row_count(&col, "notes"), 1);
    assert_eq!(col.undo_label().as_deref(), Some("Setup"));

    assert_eq!(col.undo().unwrap(), None);
    assert_eq!(row_count(&col, "notes"), 0);
    assert!(matches!(col.undo_state(), UndoState::Inactive));
}

#[test]
fn a_review_displaces_a_live_checkpoint() {
    let mut col = open_col();
    let card = add_single_card(&mut col);
    col.save(Some("Setup"), None).unwrap();

    col.mark_review(&card);
    assert!(matches!(col.undo_state(), UndoState::ReviewUndo(_)));
    assert_eq!(col.undo_label().as_deref(), Some("Review"));
}

#[test]
fn unnamed_save_keeps_a_review_stack_but_clears_a_checkpoint() {
    let mut col = open_col();
    let card = add_single_card(&mut col);

    col.mark_review(&card);
    col.save(None, None).unwrap();
    assert!(matches!(col.undo_state(), UndoState::ReviewUndo(_)));

    col.save(Some("Op"), None).unwrap();
    assert!(matches!(col.undo_state(), UndoState::Checkpoint(_)));
    col.save(None, None).unwrap();
    assert!(matches!(col.undo_state(), UndoState::Inactive));
}

#[test]
fn clear_undo_forces_inactive() {
    let mut col = open_col();
    let card = add_single_card(&mut col);
    col.mark_review(&card);

    col.clear_undo();
    assert!(!col.undo_available());
}

#[test]
fn log_review_bumps_the_rep_counter() {
    let mut col = open_col();
    let card = add_single_card(&mut col);

    col.log_review(card.id, 3).unwrap();
    col.log_review(card.id, 2).unwrap();
    assert_eq!(col.sched.reps(), 2);
}

fn open_col() -> Collection {
    Collection::open_in_memory(false).unwrap()
}

fn new_note(col: &Collection, notetype_id: NotetypeId, fields: &[&str]) -> Note {
    let notetype = col.notetypes.get(notetype_id).unwrap();
    let mut note = Note::new(notetype);
    for (index, value) in fields.iter().enumerate() {
        note.fields[index] = value.to_string();
    }
    note
}

fn add_single_card(col: &mut Collection) -> Card {
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));
    let mut note = new_note(col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();
    CardRepo::new(col.db())
        .cards_for_notes(&[note.id])
        .unwrap()
        .remove(0)
}

/// Stands in for the external scheduler answering a card: mutates the row
/// and appends a review log entry.
fn answer(col: &mut Collection, card: &Card, ease: u8) {
    let mut mutated = card.clone();
    mutated.ctype = CardType::Review;
    mutated.queue = CardQueue::Review;
    mutated.due = card.due + i32::from(ease);
    mutated.mtime_ms += 1;
    CardRepo::new(col.db()).restore_card(&mutated).unwrap();
    col.log_review(card.id, ease).unwrap();
}

fn review_count(col: &Collection, card: &Card) -> usize {
    CardRepo::new(col.db()).review_entry_count(card.id).unwrap()
}

fn row_count(col: &Collection, table: &str) -> i64 {
    col.db()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
}
