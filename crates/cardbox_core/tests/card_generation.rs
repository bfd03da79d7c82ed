use cardbox_core::repo::card_repo::CardRepo;
use cardbox_core::{
    CardTemplate, Collection, Deck, NewCardOrder, Note, Notetype, NotetypeId, PreviewMode,
    DEFAULT_DECK_ID,
};

#[test]
fn add_note_creates_one_card_per_available_template() {
    let mut col = open_col();
    let notetype_id = add_two_template_notetype(&mut col);

    let mut note = new_note(&col, notetype_id, &["question", "answer"]);
    let created = col.add_note(&mut note).unwrap();

    assert_eq!(created, 2);
    let cards = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    let ords: Vec<u16> = cards.iter().map(|card| card.template_ord).collect();
    assert_eq!(ords, vec![0, 1]);
}

#[test]
fn add_note_matches_find_templates_count() {
    let mut col = open_col();
    let notetype_id = add_two_template_notetype(&mut col);

    let mut note = new_note(&col, notetype_id, &["only front", ""]);
    let expected = col.find_templates(&note).unwrap().len();
    let created = col.add_note(&mut note).unwrap();

    assert_eq!(created, expected);
    assert_eq!(created, 1);
}

#[test]
fn add_note_with_all_empty_fields_writes_nothing() {
    let mut col = open_col();
    let notetype_id = add_two_template_notetype(&mut col);

    let mut note = new_note(&col, notetype_id, &["", ""]);
    assert!(col.find_templates(&note).unwrap().is_empty());
    assert_eq!(col.add_note(&mut note).unwrap(), 0);

    let notes: i64 = col
        .db()
        .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap();
    let cards: i64 = col
        .db()
        .query_row("SELECT COUNT(*) FROM cards;", [], |row| row.get(0))
        .unwrap();
    assert_eq!((notes, cards), (0, 0));
}

#[test]
fn cloze_note_generates_one_card_per_group() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_cloze("Cloze"));

    let mut note = new_note(&col, notetype_id, &["{{c1::foo}} {{c2::bar}}"]);
    let templates = col.find_templates(&note).unwrap();
    let ords: Vec<u16> = templates.iter().map(|template| template.ord).collect();
    assert_eq!(ords, vec![0, 1]);

    assert_eq!(col.add_note(&mut note).unwrap(), 2);
    let cards = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    let card_ords: Vec<u16> = cards.iter().map(|card| card.template_ord).collect();
    assert_eq!(card_ords, vec![0, 1]);
}

#[test]
fn cloze_note_without_groups_generates_nothing() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_cloze("Cloze"));

    let mut note = new_note(&col, notetype_id, &["no deletions here"]);
    assert_eq!(col.add_note(&mut note).unwrap(), 0);
}

#[test]
fn gen_cards_is_idempotent_without_field_changes() {
    let mut col = open_col();
    let notetype_id = add_two_template_notetype(&mut col);
    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let before = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    let removable = col.gen_cards(&[note.id]).unwrap();
    let after = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();

    assert!(removable.is_empty());
    assert_eq!(before, after);
}

#[test]
fn gen_cards_creates_missing_and_flags_orphaned_ordinals() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_cloze("Cloze"));
    let mut note = new_note(&col, notetype_id, &["{{c1::a}} {{c2::b}}"]);
    col.add_note(&mut note).unwrap();

    note.fields[0] = "{{c1::a}} only".to_string();
    col.update_note(&mut note).unwrap();

    let removable = col.gen_cards(&[note.id]).unwrap();
    let repo = CardRepo::new(col.db());
    let orphan = repo.get_card(removable[0]).unwrap().unwrap();
    assert_eq!(removable.len(), 1);
    assert_eq!(orphan.template_ord, 1);

    col.remove_cards(&removable, true).unwrap();
    let remaining = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].template_ord, 0);
}

#[test]
fn gen_cards_skips_notes_with_missing_notetype() {
    let mut col = open_col();
    let notetype_id = add_two_template_notetype(&mut col);
    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    col.notetypes.remove(notetype_id);
    let removable = col.gen_cards(&[note.id]).unwrap();
    assert!(removable.is_empty());
}

#[test]
fn filtered_default_deck_falls_back_to_default_deck() {
    let mut col = open_col();
    let mut cram = Deck::new(0, "Cram");
    cram.filtered = true;
    let cram_id = col.decks.add(cram);

    let mut notetype = Notetype::new_basic("Basic");
    notetype.default_deck_id = cram_id;
    let notetype_id = col.notetypes.add(notetype);

    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let cards = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    assert_eq!(cards[0].deck_id, DEFAULT_DECK_ID);
}

#[test]
fn template_deck_override_wins() {
    let mut col = open_col();
    let override_id = col.decks.add(Deck::new(0, "Target"));

    let mut notetype = Notetype::new_basic("Basic");
    notetype.templates[0].deck_override = Some(override_id);
    let notetype_id = col.notetypes.add(notetype);

    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let cards = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    assert_eq!(cards[0].deck_id, override_id);
}

#[test]
fn sequential_order_uses_raw_positions() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));

    let mut first = new_note(&col, notetype_id, &["one", ""]);
    let mut second = new_note(&col, notetype_id, &["two", ""]);
    col.add_note(&mut first).unwrap();
    col.add_note(&mut second).unwrap();

    let repo = CardRepo::new(col.db());
    let first_card = &repo.cards_for_notes(&[first.id]).unwrap()[0];
    let second_card = &repo.cards_for_notes(&[second.id]).unwrap()[0];
    assert_eq!(first_card.due, 1);
    assert_eq!(second_card.due, 2);
}

#[test]
fn random_order_siblings_share_one_slot() {
    let mut col = open_col();
    let mut shuffled = Deck::new(0, "Shuffled");
    shuffled.new_card_order = NewCardOrder::Random;
    let deck_id = col.decks.add(shuffled);

    let mut notetype = two_template_notetype();
    notetype.default_deck_id = deck_id;
    let notetype_id = col.notetypes.add(notetype);

    let mut note = new_note(&col, notetype_id, &["q", "a"]);
    col.add_note(&mut note).unwrap();

    let cards = CardRepo::new(col.db()).cards_for_notes(&[note.id]).unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].due, cards[1].due);
    assert!(cards[0].due >= 1 && cards[0].due < 1000);
}

#[test]
fn random_order_is_deterministic_for_a_position() {
    let mut col_a = open_col();
    let mut col_b = open_col();
    for col in [&mut col_a, &mut col_b] {
        let mut shuffled = Deck::new(0, "Shuffled");
        shuffled.new_card_order = NewCardOrder::Random;
        let deck_id = col.decks.add(shuffled);
        let mut notetype = Notetype::new_basic("Basic");
        notetype.default_deck_id = deck_id;
        let notetype_id = col.notetypes.add(notetype);
        let mut note = new_note(col, notetype_id, &["q", "a"]);
        col.add_note(&mut note).unwrap();
    }

    let due_a = single_new_due(&col_a);
    let due_b = single_new_due(&col_b);
    assert_eq!(due_a, due_b);
}

#[test]
fn preview_cards_modes_select_expected_templates() {
    let mut col = open_col();
    let notetype_id = add_two_template_notetype(&mut col);
    let mut note = new_note(&col, notetype_id, &["only front", ""]);
    col.add_note(&mut note).unwrap();

    let non_empty = col.preview_cards(&note, PreviewMode::NonEmpty).unwrap();
    let existing = col.preview_cards(&note, PreviewMode::Existing).unwrap();
    let all = col.preview_cards(&note, PreviewMode::All).unwrap();

    assert_eq!(non_empty.len(), 1);
    assert_eq!(existing.len(), 1);
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|card| card.id == 0));
}

#[test]
fn add_note_refreshes_sort_field_and_checksum() {
    let mut col = open_col();
    let notetype_id = col.notetypes.add(Notetype::new_basic("Basic"));

    let mut note = new_note(&col, notetype_id, &["<b>front</b>", "back"]);
    col.add_note(&mut note).unwrap();

    assert_eq!(note.sort_field, "front");
    assert_ne!(note.checksum, 0);
}

fn open_col() -> Collection {
    Collection::open_in_memory(false).unwrap()
}

fn two_template_notetype() -> Notetype {
    let mut notetype = Notetype::new_basic("Basic (and reversed)");
    notetype.templates.push(CardTemplate {
        ord: 1,
        name: "Card 2".to_string(),
        qfmt: "{{Back}}".to_string(),
        afmt: "{{FrontSide}}<hr>{{Front}}".to_string(),
        deck_override: None,
    });
    notetype
}

fn add_two_template_notetype(col: &mut Collection) -> NotetypeId {
    col.notetypes.add(two_template_notetype())
}

fn new_note(col: &Collection, notetype_id: NotetypeId, fields: &[&str]) -> Note {
    let notetype = col.notetypes.get(notetype_id).unwrap();
    let mut note = Note::new(notetype);
    for (index, value) in fields.iter().enumerate() {
        note.fields[index] = value.to_string();
    }
    note
}

fn single_new_due(col: &Collection) -> i32 {
    col.db()
        .query_row("SELECT due FROM cards LIMIT 1;", [], |row| row.get(0))
        .unwrap()
}
