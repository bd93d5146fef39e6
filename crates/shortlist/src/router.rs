use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::criteria::{CriterionError, CriterionId, CriterionUpdate, NewCriterion};
use crate::listings::{NewProperty, Property, PropertyId, PropertyKind};
use crate::repository::{RepositoryError, ShortlistRepository};
use crate::reviews::{ConsensusStatus, QueueCache, QueueHead, ReviewStatus};
use crate::scoring::PropertyAssessment;
use crate::service::{ReviewDetail, ShortlistError, ShortlistService};

type SharedService<S, Q> = Arc<ShortlistService<S, Q>>;

/// JSON routes over the shortlist service.
pub fn shortlist_router<S, Q>(service: SharedService<S, Q>) -> Router
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    Router::new()
        .route(
            "/api/v1/properties",
            get(list_properties::<S, Q>).post(create_property::<S, Q>),
        )
        .route(
            "/api/v1/properties/:property_id",
            get(property_report::<S, Q>).delete(delete_property::<S, Q>),
        )
        .route(
            "/api/v1/properties/:property_id/information",
            put(update_information::<S, Q>),
        )
        .route("/api/v1/properties/:property_id/sold", post(mark_sold::<S, Q>))
        .route(
            "/api/v1/properties/:property_id/fields",
            get(editable_fields::<S, Q>),
        )
        .route(
            "/api/v1/properties/:property_id/scores/:criterion_id",
            put(set_score::<S, Q>).delete(clear_score::<S, Q>),
        )
        .route(
            "/api/v1/criteria",
            get(list_criteria::<S, Q>).post(add_criterion::<S, Q>),
        )
        .route(
            "/api/v1/criteria/:criterion_id",
            put(update_criterion::<S, Q>).delete(delete_criterion::<S, Q>),
        )
        .route(
            "/api/v1/users/:username/reviews/:property_id",
            put(record_review::<S, Q>).delete(undo_review::<S, Q>),
        )
        .route("/api/v1/users/:username/queue", get(queue::<S, Q>))
        .route(
            "/api/v1/users/:username/queue/rebuild",
            post(rebuild_queue::<S, Q>),
        )
        .route("/api/v1/shortlist", get(shortlist::<S, Q>))
        .with_state(service)
}

/// HTTP status for a service error.
pub fn status_for(error: &ShortlistError) -> StatusCode {
    match error {
        ShortlistError::InvalidCategory(_)
        | ShortlistError::ScoreOutOfRange { .. }
        | ShortlistError::InformationNotApplicable { .. }
        | ShortlistError::CriterionNotApplicable { .. }
        | ShortlistError::UnknownInformation(_)
        | ShortlistError::Criterion(CriterionError::EmptyName)
        | ShortlistError::Criterion(CriterionError::ImportanceOutOfRange(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ShortlistError::UnknownUser(_) | ShortlistError::Repository(RepositoryError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        ShortlistError::Criterion(CriterionError::DuplicateKey(_))
        | ShortlistError::Criterion(CriterionError::ImmutableBuiltin(_))
        | ShortlistError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        ShortlistError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: ShortlistError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (status_for(&error), Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ShortlistError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Serialize)]
struct PropertyReport {
    property: Property,
    consensus: ConsensusStatus,
    assessment: PropertyAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    dealbreaker_warning: Option<String>,
    reviews: Vec<ReviewDetail>,
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    #[serde(default)]
    score: Option<u8>,
    #[serde(default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    status: String,
}

#[derive(Debug, Serialize)]
struct QueueView {
    queue: Vec<PropertyId>,
    next: Option<QueueHead<Property>>,
}

#[derive(Debug, Deserialize)]
struct ShortlistQuery {
    #[serde(default)]
    kind: Option<String>,
}

async fn list_properties<S, Q>(State(service): State<SharedService<S, Q>>) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.properties())
}

async fn create_property<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Json(listing): Json<NewProperty>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::CREATED, service.create_property(listing))
}

async fn property_report<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(property_id): Path<u64>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    let id = PropertyId(property_id);
    let report = (|| -> Result<PropertyReport, ShortlistError> {
        let assessment = service.assessment(id)?;
        Ok(PropertyReport {
            property: service.property(id)?,
            consensus: service.consensus_status(id)?,
            dealbreaker_warning: assessment.dealbreaker_warning(),
            assessment,
            reviews: service.review_details(id)?,
        })
    })();
    respond(StatusCode::OK, report)
}

async fn delete_property<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(property_id): Path<u64>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.delete_property(PropertyId(property_id)))
}

async fn update_information<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(property_id): Path<u64>,
    Json(values): Json<BTreeMap<String, Option<String>>>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(
        StatusCode::OK,
        service.update_information(PropertyId(property_id), values),
    )
}

async fn mark_sold<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(property_id): Path<u64>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.mark_sold(PropertyId(property_id)))
}

async fn editable_fields<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(property_id): Path<u64>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.editable_fields(PropertyId(property_id)))
}

async fn set_score<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path((property_id, criterion_id)): Path<(u64, u32)>,
    Json(payload): Json<ScorePayload>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(
        StatusCode::OK,
        service.set_manual_score(
            PropertyId(property_id),
            CriterionId(criterion_id),
            payload.score,
            payload.comment,
        ),
    )
}

async fn clear_score<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path((property_id, criterion_id)): Path<(u64, u32)>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(
        StatusCode::OK,
        service.clear_manual_score(PropertyId(property_id), CriterionId(criterion_id)),
    )
}

async fn list_criteria<S, Q>(State(service): State<SharedService<S, Q>>) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.criteria())
}

async fn add_criterion<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Json(criterion): Json<NewCriterion>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::CREATED, service.add_criterion(criterion))
}

async fn update_criterion<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(criterion_id): Path<u32>,
    Json(update): Json<CriterionUpdate>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(
        StatusCode::OK,
        service.update_criterion(CriterionId(criterion_id), update),
    )
}

async fn delete_criterion<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(criterion_id): Path<u32>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.delete_criterion(CriterionId(criterion_id)))
}

async fn record_review<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path((username, property_id)): Path<(String, u64)>,
    Json(payload): Json<ReviewPayload>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    let result = payload
        .status
        .parse::<ReviewStatus>()
        .map_err(ShortlistError::from)
        .and_then(|status| service.record_review(&username, PropertyId(property_id), status));
    respond(StatusCode::OK, result)
}

async fn undo_review<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path((username, property_id)): Path<(String, u64)>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(
        StatusCode::OK,
        service.undo_review(&username, PropertyId(property_id)),
    )
}

async fn queue<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(username): Path<String>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    let view = service.queue_for(&username).and_then(|queue| {
        Ok(QueueView {
            queue,
            next: service.next_in_queue(&username)?,
        })
    });
    respond(StatusCode::OK, view)
}

async fn rebuild_queue<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Path(username): Path<String>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    respond(StatusCode::OK, service.rebuild_queue(&username))
}

/// `?kind=house,land`; both kinds when omitted.
async fn shortlist<S, Q>(
    State(service): State<SharedService<S, Q>>,
    Query(query): Query<ShortlistQuery>,
) -> Response
where
    S: ShortlistRepository + 'static,
    Q: QueueCache + 'static,
{
    let kinds = match query.kind.as_deref() {
        None => vec![PropertyKind::House, PropertyKind::Land],
        Some(raw) => {
            let mut kinds = Vec::new();
            for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
                match PropertyKind::parse(part) {
                    Some(kind) => kinds.push(kind),
                    None => {
                        let payload = json!({ "error": format!("unknown listing type '{part}'") });
                        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
                    }
                }
            }
            kinds
        }
    };
    respond(StatusCode::OK, service.shortlist(&kinds))
}
