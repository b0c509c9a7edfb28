#[cfg(test)]
mod tests {
    use crate::auth::{NewUser, PasswordConfig, PasswordHasher, User, UserPatch};
    use crate::error::AppError;
    use crate::files::FileRecord;
    use chrono::Utc;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn new_user() -> NewUser {
        NewUser {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical-engine".to_string(),
            username: Some("ada".to_string()),
            file_id: None,
        }
    }

    fn record() -> FileRecord {
        let id = Uuid::new_v4();
        FileRecord {
            id: Some(id),
            name: id.to_string(),
            extension: "png".to_string(),
            original_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            size: 10,
            path: PathBuf::from(format!("webroot/img/{}.png", id)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_hashes_password() {
        let hasher = hasher();
        let user = User::create(1, new_user(), &hasher).unwrap();

        assert_ne!(user.password_hash(), "analytical-engine");
        assert!(user.password_hash().starts_with("$argon2id$"));
        assert!(user.verify_password("analytical-engine", &hasher).unwrap());
        assert!(!user.verify_password("difference-engine", &hasher).unwrap());
        assert!(user.modified.is_none());
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let hasher = hasher();

        let mut input = new_user();
        input.email = "not-an-email".to_string();
        assert!(matches!(User::create(1, input, &hasher), Err(AppError::Validation(_))));

        let mut input = new_user();
        input.password = "short".to_string();
        assert!(matches!(User::create(1, input, &hasher), Err(AppError::Validation(_))));

        let mut input = new_user();
        input.username = Some("ab".to_string());
        assert!(User::create(1, input, &hasher).is_err());

        let mut input = new_user();
        input.username = None;
        assert!(User::create(1, input, &hasher).is_ok());
    }

    #[test]
    fn test_serialized_user_hides_password() {
        let user = User::create(7, new_user(), &hasher()).unwrap();
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["id"], 7);
        assert!(!json.to_string().contains("$argon2id$"));
    }

    #[test]
    fn test_deserialize_stored_user() {
        let hasher = hasher();
        let hash = hasher.hash("stored-password").unwrap();
        let json = serde_json::json!({
            "id": 3,
            "file_id": null,
            "name": "Grace",
            "email": "grace@example.com",
            "password": hash,
            "username": null,
            "created": "2024-01-01T00:00:00Z",
            "modified": null
        });

        let user: User = serde_json::from_value(json).unwrap();
        assert!(user.verify_password("stored-password", &hasher).unwrap());

        let public: User = serde_json::from_value(serde_json::to_value(&user).unwrap()).unwrap();
        assert!(!public.verify_password("stored-password", &hasher).unwrap());
    }

    #[test]
    fn test_apply_patch() {
        let hasher = hasher();
        let mut user = User::create(1, new_user(), &hasher).unwrap();

        let patch = UserPatch {
            name: Some("Augusta Ada King".to_string()),
            password: Some("new-secret-pass".to_string()),
            ..Default::default()
        };
        user.apply(patch, &hasher).unwrap();

        assert_eq!(user.name, "Augusta Ada King");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.verify_password("new-secret-pass", &hasher).unwrap());
        assert!(user.modified.is_some());

        let bad = UserPatch {
            email: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(user.apply(bad, &hasher).is_err());
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_set_password() {
        let hasher = hasher();
        let mut user = User::create(1, new_user(), &hasher).unwrap();

        assert!(matches!(user.set_password("tiny", &hasher), Err(AppError::BadRequest(_))));
        user.set_password("a-much-longer-one", &hasher).unwrap();
        assert!(user.verify_password("a-much-longer-one", &hasher).unwrap());
    }

    #[test]
    fn test_attach_file() {
        let hasher = hasher();
        let mut user = User::create(1, new_user(), &hasher).unwrap();
        let avatar = record();

        user.attach_file(&avatar);
        assert_eq!(user.file_id, avatar.id);
        assert!(user.file_id.is_some());

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["file"]["extension"], "png");

        let mut named = record();
        named.id = None;
        named.name = "portrait".to_string();
        user.attach_file(&named);
        assert!(user.file_id.is_none());
        assert_eq!(user.file.as_ref().map(|f| f.file_name()), Some("portrait.png".to_string()));

        let patch = UserPatch {
            file_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        user.apply(patch, &hasher).unwrap();
        assert!(user.file.is_none());
    }
}
