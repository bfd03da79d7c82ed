use cardbox_core::hooks::CollectionEvent;
use cardbox_core::repo::card_repo::CardRepo;
use cardbox_core::repo::grave_repo::GraveRepo;
use cardbox_core::{Collection, GraveKind, Note, Notetype, NotetypeId, OFFLINE_USN};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn remove_notes_tombstones_cards_and_notes() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_cloze("Cloze"));
    let mut note = new_note(&col, notetype_id, &["{{c1::a}} {{c2::b}}"]);
    col.add_note(&mut note).unwrap();

    col.remove_notes(&[note.id]).unwrap();

    let graves = GraveRepo::new(col.db()).all_graves().unwrap();
    let card_graves = graves
        .iter()
        .filter(|grave| grave.kind == GraveKind::Card)
        .count();
    let note_graves = graves
        .iter()
        .filter(|grave| grave.kind == GraveKind::Note)
        .count();
    assert_eq!(card_graves, 2);
    assert_eq!(note_graves, 1);
    assert!(graves.iter().all(|grave| grave.usn == OFFLINE_USN));

    assert_eq!(row_count(&col, "notes"), 0);
    assert_eq!(row_count(&col, "cards"), 0);
}

#[test]
fn remove_cards_cleans_up_orphaned_notes_when_asked() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));
    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let card_ids = CardRepo::new(col.db()).card_ids_of_notes(&[note.id]).unwrap();
    col.remove_cards(&card_ids, true).unwrap();

    assert_eq!(row_count(&col, "notes"), 0);
}

#[test]
fn remove_cards_can_leave_cardless_notes_behind() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));
    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let card_ids = CardRepo::new(col.db()).card_ids_of_notes(&[note.id]).unwrap();
    col.remove_cards(&card_ids, false).unwrap();

    assert_eq!(row_count(&col, "cards"), 0);
    assert_eq!(row_count(&col, "notes"), 1);
}

#[test]
fn removing_a_partial_card_set_keeps_the_note() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_cloze("Cloze"));
    let mut note = new_note(&col, notetype_id, &["{{c1::a}} {{c2::b}}"]);
    col.add_note(&mut note).unwrap();

    let card_ids = CardRepo::new(col.db()).card_ids_of_notes(&[note.id]).unwrap();
    col.remove_cards(&card_ids[..1], true).unwrap();

    assert_eq!(row_count(&col, "cards"), 1);
    assert_eq!(row_count(&col, "notes"), 1);
}

#[test]
fn note_removal_is_announced_before_rows_disappear() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));
    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let observed = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&observed);
    col.hooks_mut().observe(move |event| {
        if let CollectionEvent::NotesWillBeRemoved(ids) = event {
            counter.set(counter.get() + ids.len());
        }
    });

    col.remove_notes(&[note.id]).unwrap();
    assert_eq!(observed.get(), 1);
}

#[test]
fn log_removed_appends_one_grave_per_id() {
    let mut col = open_col();
    col.log_removed(&[10, 11, 12], GraveKind::Deck).unwrap();

    let graves = GraveRepo::new(col.db()).all_graves().unwrap();
    assert_eq!(graves.len(), 3);
    assert!(graves.iter().all(|grave| grave.kind == GraveKind::Deck));
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

fn row_count(col: &Collection, table: &str) -> i64 {
    col.db()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap()
}
