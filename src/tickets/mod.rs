//! Ticket CRUD, sequential numbering and search.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::error::ApiError;
use crate::shared::models::{Attachment, NewTicket, Priority, Ticket, TicketChangeset};
use crate::shared::schema::{attachments, tickets};
use crate::shared::state::AppState;
use crate::shared::utils::parse_id;
use crate::storage::BlobDeletion;

pub const TICKET_NUMBER_PREFIX: &str = "Ticket-";

/// Concurrent creations that lose the race on the `ticket_number` unique
/// constraint recompute and retry this many times before giving up.
const NUMBERING_ATTEMPTS: u32 = 5;

static TICKET_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Ticket-(\d+)").expect("ticket number regex"));

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<TicketWithAttachments>,
}

#[derive(Debug, Serialize)]
pub struct TicketWithAttachments {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub attachments: Vec<AttachmentView>,
}

/// Attachment as rendered in ticket listings. `isMatch` is only present
/// when a search term was given: `true` marks filenames the term matched,
/// siblings of a matched ticket carry `false`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub id: i32,
    pub filename: String,
    pub size: i32,
    pub mimetype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_match: Option<bool>,
}

/// Numeric suffix of a stored ticket number, if it matches `Ticket-<n>`.
pub fn parse_ticket_number(number: &str) -> Option<u64> {
    TICKET_NUMBER_RE
        .captures(number)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn format_ticket_number(n: u64) -> String {
    format!("{}{}", TICKET_NUMBER_PREFIX, n)
}

/// Next number given the latest assigned one. Starts over at 1 when there
/// is no ticket yet or the stored value does not parse.
fn next_number_after(latest: Option<&str>) -> u64 {
    latest.and_then(parse_ticket_number).unwrap_or(0) + 1
}

/// Candidate number derived from the highest-id ticket, which is presumed
/// to carry the highest number. Uniqueness is enforced by the insert, not
/// by this read.
fn next_ticket_number(conn: &mut PgConnection) -> Result<String, diesel::result::Error> {
    let latest: Option<String> = tickets::table
        .order(tickets::id.desc())
        .select(tickets::ticket_number)
        .first(conn)
        .optional()?;
    Ok(format_ticket_number(next_number_after(latest.as_deref())))
}

fn flag_attachments(owned: Vec<Attachment>, search: Option<&str>) -> Vec<AttachmentView> {
    let needle = search.map(str::to_lowercase);
    owned
        .into_iter()
        .map(|a| {
            let is_match = needle
                .as_ref()
                .map(|n| a.filename.to_lowercase().contains(n));
            AttachmentView {
                id: a.id,
                filename: a.filename,
                size: a.size,
                mimetype: a.mimetype,
                is_match,
            }
        })
        .collect()
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing required field: title".to_string()))?;
    let owner = req
        .owner
        .filter(|o| !o.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Missing required field: owner".to_string()))?;
    let description = req.description.unwrap_or_default();
    let priority = match req.priority {
        Some(p) => p.parse::<Priority>().map_err(ApiError::Validation)?,
        None => Priority::default(),
    };

    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    for attempt in 1..=NUMBERING_ATTEMPTS {
        let ticket_number = next_ticket_number(&mut conn)
            .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?;
        let new_ticket = NewTicket {
            ticket_number: &ticket_number,
            title: &title,
            description: &description,
            priority,
            owner: &owner,
            created_at: Utc::now(),
        };

        match diesel::insert_into(tickets::table)
            .values(&new_ticket)
            .get_result::<Ticket>(&mut conn)
        {
            Ok(ticket) => {
                info!("Created ticket {} (id {})", ticket.ticket_number, ticket.id);
                return Ok(Json(ticket));
            }
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                warn!(
                    "Ticket number {} taken by a concurrent insert, retrying ({}/{})",
                    ticket_number, attempt, NUMBERING_ATTEMPTS
                );
            }
            Err(e) => return Err(ApiError::Database(format!("Insert error: {}", e))),
        }
    }

    Err(ApiError::Database(
        "Could not assign a unique ticket number".to_string(),
    ))
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TicketListResponse>, ApiError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let search = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let mut q = tickets::table.into_boxed();
    if let Some(term) = search {
        let pattern = format!("%{}%", term);
        q = q.filter(
            tickets::title
                .ilike(pattern.clone())
                .or(tickets::description.ilike(pattern.clone()))
                .or(tickets::owner.ilike(pattern.clone()))
                .or(tickets::ticket_number.ilike(pattern.clone()))
                .or(diesel::dsl::exists(
                    attachments::table
                        .filter(attachments::ticket_id.eq(tickets::id))
                        .filter(attachments::filename.ilike(pattern)),
                )),
        );
    }

    let rows: Vec<Ticket> = q
        .order(tickets::created_at.desc())
        .load(&mut conn)
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?;

    let grouped: Vec<Vec<Attachment>> = Attachment::belonging_to(&rows)
        .load::<Attachment>(&mut conn)
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?
        .grouped_by(&rows);

    let result = rows
        .into_iter()
        .zip(grouped)
        .map(|(ticket, owned)| TicketWithAttachments {
            ticket,
            attachments: flag_attachments(owned, search),
        })
        .collect();

    Ok(Json(TicketListResponse { tickets: result }))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    let id = parse_id(&id)?;
    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let ticket = tickets::table
        .find(id)
        .first::<Ticket>(&mut conn)
        .optional()
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    Ok(Json(ticket))
}

pub async fn update_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<Json<Ticket>, ApiError> {
    let id = parse_id(&id)?;
    let priority = req
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()
        .map_err(ApiError::Validation)?;
    let changes = TicketChangeset {
        title: req.title,
        description: req.description,
        priority,
        owner: req.owner,
    };

    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let ticket = if changes.has_changes() {
        diesel::update(tickets::table.find(id))
            .set(&changes)
            .get_result::<Ticket>(&mut conn)
            .map_err(|e| ApiError::Database(format!("Update error: {}", e)))?
    } else {
        tickets::table
            .find(id)
            .first::<Ticket>(&mut conn)
            .map_err(|e| ApiError::Database(format!("Update error: {}", e)))?
    };

    Ok(Json(ticket))
}

pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let mut conn = state
        .conn
        .get()
        .map_err(|e| ApiError::Database(format!("DB error: {}", e)))?;

    let ticket = tickets::table
        .find(id)
        .first::<Ticket>(&mut conn)
        .optional()
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("Ticket not found".to_string()))?;

    let owned: Vec<Attachment> = Attachment::belonging_to(&ticket)
        .load(&mut conn)
        .map_err(|e| ApiError::Database(format!("Query error: {}", e)))?;

    // Blobs go first: after the row delete cascades the attachment rows,
    // their paths are no longer retrievable from our own state.
    for attachment in &owned {
        match state.blobs.delete(&attachment.path) {
            BlobDeletion::Removed => info!("Deleted blob {}", attachment.path),
            BlobDeletion::Missing => warn!("Blob {} was already gone", attachment.path),
            BlobDeletion::Failed(e) => error!(
                "Failed to delete blob {} (left orphaned on disk): {}",
                attachment.path, e
            ),
        }
    }

    diesel::delete(tickets::table.find(id))
        .execute(&mut conn)
        .map_err(|e| ApiError::Database(format!("Delete error: {}", e)))?;

    info!(
        "Deleted ticket {} and {} attachment(s)",
        ticket.ticket_number,
        owned.len()
    );
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/tickets/:id",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
}

#[cfg(test)]
#[path = "tickets.test.rs"]
mod tests;
