use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub user_type: String,
}

impl TestUser {
    pub fn new(email: &str, user_type: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            user_type: user_type.to_string(),
        }
    }

    pub fn guardian(email: &str) -> Self {
        Self::new(email, "Guardian")
    }

    pub fn pediatrician(email: &str) -> Self {
        Self::new(email, "Pediatrician")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "Admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            user_type: Some(self.user_type.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    /// Mint an HS256 token the way Supabase would, signed with `secret`.
    pub fn create_token(user: &TestUser, secret: &str) -> String {
        let header = json!({"alg": "HS256", "typ": "JWT"});
        let now = Utc::now();
        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "user_type": user.user_type,
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp(),
        });

        let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        let header = json!({"alg": "HS256", "typ": "JWT"});
        let past = Utc::now() - Duration::hours(2);
        let claims = json!({
            "sub": user.id,
            "email": user.email,
            "user_type": user.user_type,
            "iat": past.timestamp(),
            "exp": (past + Duration::hours(1)).timestamp(),
        });

        let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

/// PostgREST row builders for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn availability_row(
        email: &str,
        date: &str,
        open_slots: &[&str],
        booked_slots: &[&str],
        version: i64,
    ) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": Uuid::new_v4().to_string(),
            "name": "Dr. Reyes",
            "email": email,
            "date": date,
            "time_slots": open_slots,
            "booked_slots": booked_slots,
            "status": "Available",
            "version": version,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        })
    }

    pub fn booking_row(
        id: Uuid,
        date: &str,
        time_start: &str,
        time_end: &str,
        guardian_id: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": id,
            "kind": "appointment",
            "date": date,
            "time_start": time_start,
            "time_end": time_end,
            "guardian_id": guardian_id,
            "patient_id": Uuid::new_v4().to_string(),
            "description": "Routine checkup",
            "email": "doctor@clinic.example",
            "status": status,
            "pediatrician_id": Value::Null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        })
    }
}
