//! Mini-app initData verification and the access gate

mod helpers;

use std::collections::BTreeMap;
use std::sync::Arc;
use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use helpers::*;
use proptest::prelude::*;
use CourseDesk::middleware::WebAppGate;
use CourseDesk::models::{Channel, EXTERNAL_ACTOR_ID};
use CourseDesk::services::{sign_init_data, Caller, InitDataVerifier};
use CourseDesk::utils::clock::FixedClock;
use CourseDesk::CourseDeskError;

const QUERY_ID: &str = "AAHdF6IQAAAAAN0XohDhrOrc";

fn now() -> DateTime<Utc> {
    utc(2024, 1, 12, 9, 0)
}

fn fields_for(telegram_id: i64, auth_date: i64) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("auth_date".to_string(), auth_date.to_string());
    fields.insert("query_id".to_string(), QUERY_ID.to_string());
    fields.insert(
        "user".to_string(),
        format!(r#"{{"id":{},"first_name":"Maria","last_name":"Petrova"}}"#, telegram_id),
    );
    fields
}

fn verifier() -> InitDataVerifier {
    InitDataVerifier::new(TEST_BOT_TOKEN, 86_400, Arc::new(FixedClock::new(now())))
}

/// Re-encode `fields` with a hash computed for different content
fn with_hash(fields: &BTreeMap<String, String>, hash: &str) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", hash);
    serializer.finish()
}

fn hash_of(init_data: &str) -> String {
    url::form_urlencoded::parse(init_data.as_bytes())
        .find(|(key, _)| key == "hash")
        .map(|(_, value)| value.into_owned())
        .expect("signed initData carries a hash")
}

proptest! {
    #[test]
    fn tampered_field_value_is_rejected(
        field in prop::sample::select(vec!["auth_date", "query_id", "user"]),
        position in 0usize..64,
        replacement in proptest::char::range('a', 'z'),
    ) {
        let fields = fields_for(555, now().timestamp() - 30);
        let signed = sign_init_data(TEST_BOT_TOKEN, &fields).unwrap();
        let hash = hash_of(&signed);

        let mut tampered = fields.clone();
        let value = tampered.get_mut(field).unwrap();
        let mut chars: Vec<char> = value.chars().collect();
        let index = position % chars.len();
        let replacement = if chars[index] == replacement {
            if replacement == 'z' { 'a' } else { 'z' }
        } else {
            replacement
        };
        chars[index] = replacement;
        *value = chars.into_iter().collect();

        prop_assert!(verifier().verify(&with_hash(&tampered, &hash)).is_err());
    }

    #[test]
    fn tampered_hash_is_rejected(position in 0usize..64, nibble in 0u32..16) {
        let signed = sign_init_data(TEST_BOT_TOKEN, &fields_for(555, now().timestamp())).unwrap();
        let hash = hash_of(&signed);

        let mut chars: Vec<char> = hash.chars().collect();
        let original = chars[position];
        let mut digit = char::from_digit(nibble, 16).unwrap();
        if digit == original {
            digit = char::from_digit((nibble + 1) % 16, 16).unwrap();
        }
        chars[position] = digit;
        let tampered: String = chars.into_iter().collect();

        let fields = fields_for(555, now().timestamp());
        prop_assert!(verifier().verify(&with_hash(&fields, &tampered)).is_err());
    }

    #[test]
    fn fresh_init_data_is_accepted(age in 0i64..=86_400) {
        let signed = sign_init_data(TEST_BOT_TOKEN, &fields_for(555, now().timestamp() - age)).unwrap();
        let verified = verifier().verify(&signed).unwrap();
        prop_assert_eq!(verified.telegram_id, 555);
        prop_assert_eq!(verified.display_name, "Maria Petrova");
    }

    #[test]
    fn stale_init_data_is_rejected(extra in 1i64..1_000_000) {
        let signed = sign_init_data(TEST_BOT_TOKEN, &fields_for(555, now().timestamp() - 86_400 - extra)).unwrap();
        prop_assert!(matches!(verifier().verify(&signed), Err(CourseDeskError::AuthInvalid)));
    }
}

#[test]
fn test_hash_from_another_bot_is_rejected() {
    let signed = sign_init_data("987654321:OTHER-bot", &fields_for(555, now().timestamp())).unwrap();
    assert_matches!(verifier().verify(&signed), Err(CourseDeskError::AuthInvalid));
}

#[test]
fn test_display_name_falls_back_to_username_then_id() {
    let mut fields = fields_for(555, now().timestamp());
    fields.insert("user".to_string(), r#"{"id":555,"username":"maria_p"}"#.to_string());
    let signed = sign_init_data(TEST_BOT_TOKEN, &fields).unwrap();
    assert_eq!(verifier().verify(&signed).unwrap().display_name, "maria_p");

    fields.insert("user".to_string(), r#"{"id":555}"#.to_string());
    let signed = sign_init_data(TEST_BOT_TOKEN, &fields).unwrap();
    assert_eq!(verifier().verify(&signed).unwrap().display_name, "555");
}

#[tokio::test]
async fn test_gate_identifies_admin_and_teacher() {
    let fx = Fixture::at(now());
    let teacher = fx.teacher("Maria", Some(555));
    let gate = WebAppGate::new(&fx.services);

    let admin_data = sign_init_data(TEST_BOT_TOKEN, &fields_for(ADMIN_TELEGRAM_ID, now().timestamp())).unwrap();
    let session = gate.authenticate(&admin_data).await.unwrap();
    assert_eq!(session.caller, Caller::Admin);

    let teacher_data = sign_init_data(TEST_BOT_TOKEN, &fields_for(555, now().timestamp())).unwrap();
    let session = gate.authenticate(&teacher_data).await.unwrap();
    assert_eq!(session.caller, Caller::Teacher(teacher.id));
    assert_eq!(session.actor.user_id, EXTERNAL_ACTOR_ID);
    assert_eq!(session.actor.external_id.as_deref(), Some("555"));
    assert_eq!(session.actor.display_name, "Maria Petrova");

    let stranger = sign_init_data(TEST_BOT_TOKEN, &fields_for(999, now().timestamp())).unwrap();
    assert_matches!(gate.authenticate(&stranger).await, Err(CourseDeskError::Forbidden(_)));

    assert_matches!(gate.authenticate("user=%7B%7D&hash=00").await, Err(CourseDeskError::AuthInvalid));
}

#[tokio::test]
async fn test_gate_follows_replacement() {
    let fx = Fixture::at(now());
    let regular = fx.teacher("Maria", Some(555));
    let substitute = fx.teacher("Olga", Some(777));
    let group = fx.friday_group(regular.id);
    let lesson = fx.lesson_on(group.id, date(2024, 1, 12)).await;
    fx.store.add_replacement(lesson.id, substitute.id).unwrap();
    let gate = WebAppGate::new(&fx.services);

    let regular_data = sign_init_data(TEST_BOT_TOKEN, &fields_for(555, now().timestamp())).unwrap();
    assert_matches!(
        gate.authorize_lesson(&regular_data, lesson.id).await,
        Err(CourseDeskError::Forbidden(_))
    );

    let substitute_data = sign_init_data(TEST_BOT_TOKEN, &fields_for(777, now().timestamp())).unwrap();
    let session = gate.authorize_lesson(&substitute_data, lesson.id).await.unwrap();

    // The verified session is what a field edit is attributed to
    fx.services
        .lifecycle
        .set_topic(lesson.id, "Spins", &session.actor, Channel::Telegram)
        .await
        .unwrap();
    let history = fx.services.audit.history(lesson.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].changed_by, EXTERNAL_ACTOR_ID);
    assert_eq!(history[0].changed_by_external_id.as_deref(), Some("777"));
}
