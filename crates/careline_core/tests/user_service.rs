use careline_core::db::open_db_in_memory;
use careline_core::model::user::{UserPatch, UserRole, UserStatus};
use careline_core::model::user_info::{InfoUserType, UserInfo};
use careline_core::{
    ChangeOp, EntityStore, ListQuery, RecordingDispatcher, RepoError, ServiceError,
    SqliteEntityStore, SqliteSequenceAllocator, SqliteUserService,
};
use std::sync::Arc;

const PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA";

fn service(conn: &rusqlite::Connection) -> (SqliteUserService<'_>, Arc<RecordingDispatcher>) {
    let recorder = Arc::new(RecordingDispatcher::new());
    let service = SqliteUserService::try_from_connection(conn, recorder.clone()).unwrap();
    (service, recorder)
}

#[test]
fn verify_helpers_match_role_status_and_liveness() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let doctor = service
        .create_by_username("dr_zhou", PASSWORD_HASH, UserRole::Doctor, "周医生")
        .unwrap()
        .unwrap();
    let ma = service
        .create_by_username("ma_sun", PASSWORD_HASH, UserRole::Ma, "孙助理")
        .unwrap()
        .unwrap();

    assert_eq!(service.verify_user(doctor.id).unwrap().unwrap().id, doctor.id);
    assert!(service.verify_doctor(doctor.id).unwrap().is_some());
    assert!(service.verify_patient(doctor.id).unwrap().is_none());
    assert!(service.verify_ma(ma.id).unwrap().is_some());
    assert!(service.verify_pa(ma.id).unwrap().is_none());
    assert!(service.verify_user(9_999).unwrap().is_none());
}

#[test]
fn disabled_and_removed_users_do_not_verify() {
    let conn = open_db_in_memory().unwrap();
    let (service, recorder) = service(&conn);

    let mut disabled = service
        .create_by_username("pa_wu", PASSWORD_HASH, UserRole::Pa, "吴助理")
        .unwrap()
        .unwrap();
    service
        .update_profile(
            &mut disabled,
            &UserPatch {
                status: Some(UserStatus::Disabled),
                ..UserPatch::default()
            },
        )
        .unwrap();
    assert!(service.verify_pa(disabled.id).unwrap().is_none());

    let mut removed = service
        .create_by_username("pa_zheng", PASSWORD_HASH, UserRole::Pa, "郑助理")
        .unwrap()
        .unwrap();
    service.remove_user(&mut removed).unwrap();
    assert!(service.verify_pa(removed.id).unwrap().is_none());
    assert!(service.find_by_username("pa_zheng").unwrap().is_none());

    let events = recorder.take();
    assert_eq!(events.len(), 1, "only the removal is notable");
    assert_eq!(events[0].op(), ChangeOp::Delete);
}

#[test]
fn password_accounts_get_unique_api_tokens() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let first = service
        .create_by_username(" alpha ", PASSWORD_HASH, UserRole::Normal, "甲")
        .unwrap()
        .unwrap();
    let second = service
        .create_by_username("beta", PASSWORD_HASH, UserRole::Normal, "乙")
        .unwrap()
        .unwrap();

    assert_eq!(first.username.as_deref(), Some("alpha"));
    let first_token = first.api_token.clone().unwrap();
    assert_eq!(first_token.len(), 64);
    assert_ne!(Some(first_token), second.api_token);

    let found = service.find_by_username("alpha").unwrap().unwrap();
    assert_eq!(found.id, first.id);
    assert_eq!(found.password_hash.as_deref(), Some(PASSWORD_HASH));
}

#[test]
fn blank_password_hash_is_rejected_before_allocation() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let err = service
        .create_by_username("nohash", "  ", UserRole::Normal, "无")
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let next = service
        .create_by_username("hashed", PASSWORD_HASH, UserRole::Normal, "有")
        .unwrap()
        .unwrap();
    assert_eq!(next.id, 1);
}

#[test]
fn duplicate_username_yields_none() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    service
        .create_by_username("taken", PASSWORD_HASH, UserRole::Normal, "一")
        .unwrap()
        .unwrap();
    let duplicate = service
        .create_by_username("taken", PASSWORD_HASH, UserRole::Normal, "二")
        .unwrap();
    assert!(duplicate.is_none());
}

#[test]
fn wechat_users_are_patients_keyed_by_openid() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let user = service
        .create_wechat_user("oAbC123", "微信用户", "https://img.example.com/a.png")
        .unwrap()
        .unwrap();
    assert_eq!(user.role, UserRole::Normal);
    assert_eq!(user.openid.as_deref(), Some("oAbC123"));
    assert_eq!(user.name, "微信用户");
    assert!(service.verify_patient(user.id).unwrap().is_some());

    let again = service
        .create_wechat_user("oAbC123", "重复", "")
        .unwrap();
    assert!(again.is_none());

    let err = service.create_wechat_user(" ", "空", "").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn staff_onboarding_creates_profile_with_department() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let staff = service
        .create_staff_user("ma_qian", PASSWORD_HASH, UserRole::Ma, "钱助理")
        .unwrap()
        .unwrap();
    assert_eq!(staff.role, UserRole::Ma);

    let infos: SqliteEntityStore<'_, UserInfo> =
        SqliteEntityStore::try_new(&conn, Arc::new(RecordingDispatcher::new())).unwrap();
    let profiles = infos.list(&ListQuery::default()).unwrap();
    assert_eq!(profiles.len(), 1);
    let profile = &profiles[0];
    assert_eq!(profile.user_id, staff.id);
    assert_eq!(profile.user_type, InfoUserType::Staff);
    assert_eq!(profile.role.as_deref(), Some("MA"));
    assert_eq!(profile.department.as_deref(), Some("医疗助理部"));
}

#[test]
fn staff_onboarding_ignores_non_staff_roles() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    for role in [UserRole::Normal, UserRole::Doctor] {
        let created = service
            .create_staff_user("not_staff", PASSWORD_HASH, role, "外人")
            .unwrap();
        assert!(created.is_none());
    }
    assert!(service.find_by_username("not_staff").unwrap().is_none());
}

#[test]
fn doctor_onboarding_optionally_creates_doctor_row() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let with_row = service
        .create_doctor_user("dr_he", PASSWORD_HASH, "何医生", true)
        .unwrap()
        .unwrap();
    let without_row = service
        .create_doctor_user("dr_lu", PASSWORD_HASH, "陆医生", false)
        .unwrap()
        .unwrap();

    let doctor = service.doctor_for_user(with_row.id).unwrap().unwrap();
    assert_eq!(doctor.name, "何医生");
    assert!(service.doctor_for_user(without_row.id).unwrap().is_none());
    assert!(service.verify_doctor(without_row.id).unwrap().is_some());
}

#[test]
fn invalid_doctor_row_leaves_no_account_behind() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let err = service
        .create_doctor_user("dr_blank", PASSWORD_HASH, "  ", true)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Repo(RepoError::Validation(_))));
    assert!(service.find_by_username("dr_blank").unwrap().is_none());

    let sequences = SqliteSequenceAllocator::new(&conn);
    assert_eq!(sequences.current_value("users").unwrap(), 0);
    assert_eq!(sequences.current_value("doctors").unwrap(), 0);

    let retry = service
        .create_doctor_user("dr_blank", PASSWORD_HASH, "白医生", true)
        .unwrap()
        .unwrap();
    assert_eq!(retry.id, 1);
    assert!(service.doctor_for_user(retry.id).unwrap().is_some());
}

#[test]
fn patients_count_as_purchased_once_profiled() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);

    let patient = service
        .create_wechat_user("oPatient", "患者", "")
        .unwrap()
        .unwrap();
    assert!(!service.is_purchased_user(patient.id).unwrap());

    let info = service.attach_patient_info(&patient, "王小明").unwrap().unwrap();
    assert_eq!(info.user_type, InfoUserType::Patient);
    assert!(service.is_purchased_user(patient.id).unwrap());

    let second = service.attach_patient_info(&patient, "王小明").unwrap();
    assert!(second.is_none(), "one profile per user");

    let doctor = service
        .create_doctor_user("dr_ma", PASSWORD_HASH, "马医生", false)
        .unwrap()
        .unwrap();
    assert!(!service.is_purchased_user(doctor.id).unwrap());
    let err = service.attach_patient_info(&doctor, "马医生").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn removed_profile_can_be_replaced() {
    let conn = open_db_in_memory().unwrap();
    let (service, _) = service(&conn);
    let infos: SqliteEntityStore<'_, UserInfo> =
        SqliteEntityStore::try_new(&conn, Arc::new(RecordingDispatcher::new())).unwrap();

    let patient = service
        .create_wechat_user("oReprofile", "患者", "")
        .unwrap()
        .unwrap();
    let mut first = service.attach_patient_info(&patient, "李小红").unwrap().unwrap();
    infos.delete(&mut first).unwrap();
    assert!(!service.is_purchased_user(patient.id).unwrap());

    let second = service
        .attach_patient_info(&patient, "李小红")
        .unwrap()
        .expect("a tombstoned profile must not block a new one");
    assert_ne!(second.id, first.id);
    assert!(service.is_purchased_user(patient.id).unwrap());

    let all = infos
        .list(&ListQuery {
            include_deleted: true,
            ..ListQuery::default()
        })
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn rename_goes_through_the_notifier() {
    let conn = open_db_in_memory().unwrap();
    let (service, recorder) = service(&conn);

    let mut user = service
        .create_wechat_user("oRename", "旧昵称", "")
        .unwrap()
        .unwrap();
    service.rename_user(&mut user, "新昵称").unwrap();

    let events = recorder.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_kind(), "user");
    assert_eq!(events[0].attributes()["name"], serde_json::json!("新昵称"));
    assert_eq!(user.name, "新昵称");
}
