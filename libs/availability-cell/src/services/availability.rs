// libs/availability-cell/src/services/availability.rs
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use chrono::{NaiveDate, Utc};
use shared_config::AppConfig;
use shared_database::supabase::{returning_representation, SupabaseClient};
use shared_models::auth::User;

use crate::models::{AvailabilityDay, AvailabilityError, PublishAvailabilityRequest};
use crate::services::timeslot;

const MAX_CAS_ATTEMPTS: u32 = 3;

pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Publish (upsert) a pediatrician's open slots for a date. Replaces
    /// `time_slots` and `status` wholesale; `booked_slots` is never touched,
    /// except that labels already booked are dropped from the incoming open
    /// set so the two sets stay disjoint. Serialized against concurrent
    /// bookings through the row's version column.
    pub async fn publish(
        &self,
        user: &User,
        request: PublishAvailabilityRequest,
        auth_token: &str,
    ) -> Result<AvailabilityDay, AvailabilityError> {
        debug!("Publishing availability for {} on {}", request.email, request.date);

        if request.name.trim().is_empty()
            || request.email.trim().is_empty()
            || request.status.trim().is_empty()
        {
            return Err(AvailabilityError::ValidationError(
                "All fields are required".to_string(),
            ));
        }

        let mut open_slots = Vec::with_capacity(request.time_slots.len());
        for label in &request.time_slots {
            let normalized = timeslot::normalize_label(label)?;
            if !open_slots.contains(&normalized) {
                open_slots.push(normalized);
            }
        }

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            match self.load_for_date(&request.email, request.date, auth_token).await {
                Ok(existing) => {
                    let booked = existing.normalized_booked()?;
                    let replacement: Vec<String> = open_slots
                        .iter()
                        .filter(|slot| !booked.contains(slot))
                        .cloned()
                        .collect();

                    let committed = self
                        .commit_slots(
                            &request.email,
                            request.date,
                            existing.version,
                            &replacement,
                            &booked,
                            Some(&request.status),
                            auth_token,
                        )
                        .await?;

                    if let Some(updated) = committed {
                        info!(
                            "Availability republished for {} on {} ({} open slots)",
                            request.email,
                            request.date,
                            updated.open_slots.len()
                        );
                        return Ok(updated);
                    }
                    warn!(
                        "Availability version moved while publishing for {} on {} (attempt {})",
                        request.email, request.date, attempt
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64))
                        .await;
                }
                Err(AvailabilityError::NotFound) => {
                    return self.insert_new(user, &request, &open_slots, auth_token).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AvailabilityError::DatabaseError(
            "Failed to publish availability after multiple attempts".to_string(),
        ))
    }

    /// Load the availability row for (contact email, date).
    pub async fn load_for_date(
        &self,
        email: &str,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<AvailabilityDay, AvailabilityError> {
        let path = format!(
            "/rest/v1/availability?email=eq.{}&date=eq.{}",
            urlencoding::encode(email),
            date
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(AvailabilityError::NotFound)?;

        serde_json::from_value(row)
            .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse availability: {}", e)))
    }

    /// Conditional write of the two slot sets, keyed on the version the
    /// caller read. Returns `None` when the row's version moved in between,
    /// in which case the caller reloads and decides whether to retry.
    pub async fn commit_slots(
        &self,
        email: &str,
        date: NaiveDate,
        expected_version: i64,
        open_slots: &[String],
        booked_slots: &[String],
        status: Option<&str>,
        auth_token: &str,
    ) -> Result<Option<AvailabilityDay>, AvailabilityError> {
        let path = format!(
            "/rest/v1/availability?email=eq.{}&date=eq.{}&version=eq.{}",
            urlencoding::encode(email),
            date,
            expected_version
        );

        let mut update = Map::new();
        update.insert("time_slots".to_string(), json!(open_slots));
        update.insert("booked_slots".to_string(), json!(booked_slots));
        update.insert("version".to_string(), json!(expected_version + 1));
        update.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        if let Some(status) = status {
            update.insert("status".to_string(), json!(status));
        }

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update)),
                Some(returning_representation()),
            )
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let updated = serde_json::from_value(row).map_err(|e| {
                    AvailabilityError::DatabaseError(format!("Failed to parse availability: {}", e))
                })?;
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    /// Move a booked slot back to the open set (declined or deleted
    /// booking). Returns false when the slot was not booked, which is a
    /// no-op rather than an error. Retries on version races.
    pub async fn restore_slot(
        &self,
        email: &str,
        date: NaiveDate,
        canonical_label: &str,
        auth_token: &str,
    ) -> Result<bool, AvailabilityError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let day = match self.load_for_date(email, date, auth_token).await {
                Ok(day) => day,
                // Row republished away entirely; nothing to restore into.
                Err(AvailabilityError::NotFound) => return Ok(false),
                Err(e) => return Err(e),
            };

            let Some((open, booked)) = day.release(canonical_label)? else {
                return Ok(false);
            };

            let committed = self
                .commit_slots(email, date, day.version, &open, &booked, None, auth_token)
                .await?;

            if committed.is_some() {
                info!("Restored slot {} for {} on {}", canonical_label, email, date);
                return Ok(true);
            }
            warn!(
                "Availability version moved while restoring slot for {} on {} (attempt {})",
                email, date, attempt
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(100 * attempt as u64)).await;
        }

        Err(AvailabilityError::DatabaseError(
            "Failed to restore slot after multiple attempts".to_string(),
        ))
    }

    /// Calendar view: date -> {status, name, email, slots}. Pediatricians
    /// see their own rows; guardians see every published row.
    pub async fn get_marked_dates(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Value, AvailabilityError> {
        let path = if user.is_pediatrician() {
            format!(
                "/rest/v1/availability?user_id=eq.{}&order=date.asc",
                urlencoding::encode(&user.id)
            )
        } else {
            "/rest/v1/availability?order=date.asc".to_string()
        };

        let rows: Vec<AvailabilityDay> = {
            let result: Vec<Value> = self
                .supabase
                .request(Method::GET, &path, Some(auth_token), None)
                .await
                .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

            result
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    AvailabilityError::DatabaseError(format!("Failed to parse availability: {}", e))
                })?
        };

        let mut marked = Map::new();
        for row in rows {
            marked.insert(
                row.date.to_string(),
                json!({
                    "status": row.status,
                    "name": row.name,
                    "email": row.email,
                    "time_slots": row.normalized_open()?,
                    "booked_slots": row.normalized_booked()?,
                }),
            );
        }

        Ok(Value::Object(marked))
    }

    async fn insert_new(
        &self,
        user: &User,
        request: &PublishAvailabilityRequest,
        open_slots: &[String],
        auth_token: &str,
    ) -> Result<AvailabilityDay, AvailabilityError> {
        let row = json!({
            "user_id": user.id,
            "name": request.name,
            "email": request.email,
            "date": request.date,
            "time_slots": open_slots,
            "booked_slots": [],
            "status": request.status,
            "version": 1,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/availability",
                Some(auth_token),
                Some(row),
                Some(returning_representation()),
            )
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or_else(|| {
            AvailabilityError::DatabaseError("Failed to create availability".to_string())
        })?;

        let created: AvailabilityDay = serde_json::from_value(row).map_err(|e| {
            AvailabilityError::DatabaseError(format!("Failed to parse availability: {}", e))
        })?;

        info!(
            "Availability created for {} on {} ({} open slots)",
            created.email,
            created.date,
            created.open_slots.len()
        );
        Ok(created)
    }
}
