//! End-to-end: proposals validated and written through `UserService` against
//! an in-memory SQLite database.

use std::collections::BTreeMap;
use std::sync::Arc;

use agora_db::{Database, collaborators};
use agora_types::{
    AccountFlag, ErrorCode, FieldKind, FieldValue, Mode, OptionsInput, ProfileFieldDefinition,
    ProposedUser, RenameTarget,
};
use agora_users::{LanguagePacks, Precondition, Settings, UserError, UserService};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn setup() -> (Arc<Database>, UserService) {
    init_tracing();
    let db = Arc::new(Database::open_in_memory().unwrap());
    let settings = Settings::default();
    let locales = Arc::new(LanguagePacks::from_settings(&settings));
    let service = UserService::new(collaborators(db.clone(), locales), settings);
    (db, service)
}

fn mailbox(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

fn signup(name: &str) -> ProposedUser {
    ProposedUser {
        username: Some(name.into()),
        password: Some("s3cret-pass".into()),
        password_confirm: Some("s3cret-pass".into()),
        email: Some(format!("{}@example.com", mailbox(name))),
        ..Default::default()
    }
}

fn register(service: &UserService, name: &str) -> i64 {
    let mut handler = service.validate_proposal(signup(name), Mode::Insert).unwrap();
    assert!(handler.is_valid(), "{:?}", handler.errors());
    service.insert_user(&mut handler).unwrap().uid
}

fn rename(service: &UserService, uid: i64, to: &str) -> Result<agora_types::UpdatedUser, UserError> {
    let proposal = ProposedUser {
        uid: Some(uid),
        username: Some(to.into()),
        ..Default::default()
    };
    let mut handler = service.validate_proposal(proposal, Mode::Update).unwrap();
    assert!(handler.is_valid(), "{:?}", handler.errors());
    service.update_user(&mut handler)
}

#[test]
fn register_then_read_back() {
    let (db, service) = setup();
    db.define_profile_field(&ProfileFieldDefinition {
        fid: 0,
        name: "Location".into(),
        kind: FieldKind::Text,
        options: vec![],
        required: false,
        editable: true,
        display_order: 1,
    })
    .unwrap();

    let mut proposal = signup("alice");
    let mut options = OptionsInput {
        posts_per_page: Some(15),
        ..Default::default()
    };
    options.flags.insert(AccountFlag::HideEmail, true);
    proposal.options = Some(options);
    proposal.language = Some("english".into());

    let mut handler = service.validate_proposal(proposal, Mode::Insert).unwrap();
    let stored = service.persist(&mut handler).unwrap();

    assert_eq!(stored.record.username, "alice");
    assert_eq!(stored.record.usergroup, 2);
    assert!(stored.record.options.flag(AccountFlag::HideEmail));
    assert_eq!(stored.record.options.posts_per_page, 15);
    assert_eq!(stored.record.language, "english");
    assert!(stored.record.password.starts_with("$argon2"));
    assert!(!stored.record.salt.is_empty());

    let fields = db.get_user_fields(stored.uid).unwrap();
    assert_eq!(fields.len(), 1);
    assert!(fields.values().all(String::is_empty));

    let stats = db.get_stats().unwrap().unwrap();
    assert_eq!(stats.user_count, 1);
    assert_eq!(stats.newest_username, "alice");
}

#[test]
fn second_registration_differing_only_in_case_is_rejected() {
    let (_db, service) = setup();
    register(&service, "Alice");

    let handler = service.validate_proposal(signup("alice"), Mode::Insert).unwrap();
    assert!(!handler.is_valid());
    assert_eq!(handler.errors().len(), 1);
    assert_eq!(handler.errors()[0].code, ErrorCode::AlreadyExists);

    register(&service, "Émile");
    let handler = service.validate_proposal(signup("émile"), Mode::Insert).unwrap();
    assert_eq!(handler.errors().len(), 1);
    assert_eq!(handler.errors()[0].code, ErrorCode::AlreadyExists);
}

#[test]
fn referrer_matched_regardless_of_case() {
    let (db, service) = setup();
    let referrer = register(&service, "Émile");

    let mut proposal = signup("frank");
    proposal.referrer = Some("ÉMILE".into());
    let mut handler = service.validate_proposal(proposal, Mode::Insert).unwrap();
    assert!(handler.is_valid(), "{:?}", handler.errors());
    let uid = service.insert_user(&mut handler).unwrap().uid;
    assert_eq!(db.get_user(uid).unwrap().unwrap().record.referrer, referrer);
}

#[test]
fn banned_name_from_storage() {
    let (db, service) = setup();
    db.add_banned_username("moderator").unwrap();

    let handler = service
        .validate_proposal(signup("moderator"), Mode::Insert)
        .unwrap();
    assert_eq!(handler.errors()[0].key, "banned_username");
}

#[test]
fn rejected_proposal_leaves_database_untouched() {
    let (db, service) = setup();
    let mut proposal = signup("bob");
    proposal.password_confirm = Some("different".into());

    let mut handler = service.validate_proposal(proposal, Mode::Insert).unwrap();
    assert!(matches!(
        service.insert_user(&mut handler),
        Err(UserError::Precondition(Precondition::Invalid { .. }))
    ));
    assert!(db.get_uid_by_username("bob").unwrap().is_none());
    assert!(db.get_stats().unwrap().is_none());
}

#[test]
fn required_profile_field_enforced() {
    let (db, service) = setup();
    let fid = db
        .define_profile_field(&ProfileFieldDefinition {
            fid: 0,
            name: "Colour".into(),
            kind: FieldKind::Radio,
            options: vec!["Red".into(), "Blue".into()],
            required: true,
            editable: true,
            display_order: 1,
        })
        .unwrap();

    let handler = service.validate_proposal(signup("carol"), Mode::Insert).unwrap();
    assert_eq!(handler.errors()[0].key, "missing_required_profile_field");
    assert_eq!(handler.errors()[0].params, vec!["Colour"]);

    let mut proposal = signup("carol");
    proposal.profile_fields = Some(BTreeMap::from([(fid, FieldValue::Single("Blue".into()))]));
    let mut handler = service.validate_proposal(proposal, Mode::Insert).unwrap();
    let uid = service.insert_user(&mut handler).unwrap().uid;
    assert_eq!(db.get_user_fields(uid).unwrap()[&fid], "Blue");
}

#[test]
fn rename_propagates_to_content() {
    let (db, service) = setup();
    let uid = register(&service, "alice");
    let fid = db.create_forum("General").unwrap();
    let tid = db.create_thread(fid, "Welcome", uid, "alice").unwrap();

    let updated = rename(&service, uid, "alicia").unwrap();
    assert_eq!(updated.renamed.unwrap().from, "alice");

    assert_eq!(db.get_user(uid).unwrap().unwrap().record.username, "alicia");
    let thread = db.get_thread(tid).unwrap().unwrap();
    assert_eq!(thread.username, "alicia");
    assert_eq!(thread.last_poster, "alicia");
    assert_eq!(db.get_forum(fid).unwrap().unwrap().last_poster, "alicia");
    assert!(
        db.get_posts_in_thread(tid)
            .unwrap()
            .iter()
            .all(|p| p.username == "alicia")
    );
}

#[test]
fn failed_forum_rename_is_rolled_back() {
    let (db, service) = setup();
    let uid = register(&service, "alice");
    let fid = db.create_forum("General").unwrap();
    let tid = db.create_thread(fid, "Welcome", uid, "alice").unwrap();

    db.with_conn(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER forums_locked BEFORE UPDATE OF lastposter ON forums
             BEGIN SELECT RAISE(ABORT, 'forums are read-only'); END;",
        )?;
        Ok(())
    })
    .unwrap();

    match rename(&service, uid, "alicia").unwrap_err() {
        UserError::PartialPropagation {
            completed,
            failed,
            compensated,
            ..
        } => {
            assert_eq!(completed.len(), 3);
            assert_eq!(failed, RenameTarget::ForumLastPosters);
            assert!(compensated);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(db.get_user(uid).unwrap().unwrap().record.username, "alice");
    let thread = db.get_thread(tid).unwrap().unwrap();
    assert_eq!(thread.username, "alice");
    assert_eq!(thread.last_poster, "alice");
    assert_eq!(db.get_forum(fid).unwrap().unwrap().last_poster, "alice");

    db.with_conn(|conn| {
        conn.execute_batch("DROP TRIGGER forums_locked;")?;
        Ok(())
    })
    .unwrap();

    let updated = rename(&service, uid, "alicia").unwrap();
    assert_eq!(updated.renamed.unwrap().from, "alice");
    assert_eq!(db.get_user(uid).unwrap().unwrap().record.username, "alicia");
    let thread = db.get_thread(tid).unwrap().unwrap();
    assert_eq!(thread.username, "alicia");
    assert_eq!(thread.last_poster, "alicia");
    assert_eq!(db.get_forum(fid).unwrap().unwrap().last_poster, "alicia");
    assert!(
        db.get_posts_in_thread(tid)
            .unwrap()
            .iter()
            .all(|p| p.username == "alicia")
    );
}

#[test]
fn update_keeps_untouched_columns() {
    let (db, service) = setup();
    let uid = register(&service, "dave");
    let before = db.get_user(uid).unwrap().unwrap().record;

    let proposal = ProposedUser {
        uid: Some(uid),
        website: Some("dave.example.net".into()),
        ..Default::default()
    };
    let mut handler = service.validate_proposal(proposal, Mode::Update).unwrap();
    let updated = service.update_user(&mut handler).unwrap();
    assert_eq!(updated.columns_written, 1);

    let after = db.get_user(uid).unwrap().unwrap().record;
    assert_eq!(after.website, "http://dave.example.net");
    assert_eq!(after.password, before.password);
    assert_eq!(after.reg_date, before.reg_date);
    assert_eq!(after.options, before.options);
}
