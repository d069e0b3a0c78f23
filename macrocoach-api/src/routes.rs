use actix_web::{error, get, post, web, HttpRequest, HttpResponse, Responder};
use futures::stream;
use itertools::Itertools;
use log::{debug, info};
use macrocoach_model::{
    assessment::{AssessmentStatus, DashboardStats, NewAssessment},
    calculator,
    meal::{MealFilter, NewMeal},
    message::{InboxEntry, NewMessage},
    metrics::{self, Metric, MetricSummary, NewMetric},
    plan::{NewPlan, PlanStatus},
    presenter,
    profile::ProfileForm,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, session, AppState};

const RECENT_ASSESSMENTS: u32 = 5;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(calculate)
        .service(get_coach)
        .service(get_metrics)
        .service(add_metric)
        .service(unread_count)
        .service(conversation_events)
        .service(get_conversation)
        .service(send_message)
        .service(list_meals)
        .service(add_meal)
        .service(submit_assessment)
        .service(assessment_plan)
        .service(inbox)
        .service(list_assessments)
        .service(set_assessment_status)
        .service(create_plan)
        .service(list_plans)
        .service(activate_plan)
        .service(dashboard);
}

#[post("/calculate")]
async fn calculate(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Json<ProfileForm>,
) -> Result<impl Responder, ApiError> {
    let session = session::resolve(&req, state.users.as_ref()).await?;
    let input = form.validate()?;
    let result = calculator::calculate(&input);
    debug!("Calculated {:?} for {:?}", result, input);

    Ok(web::Json(presenter::present(Some(&result), session.as_ref())))
}

#[derive(Serialize, Deserialize)]
struct Coach {
    id: Uuid,
    display_name: String,
}

#[get("/coach")]
async fn get_coach(state: web::Data<AppState>) -> Result<impl Responder, ApiError> {
    let admin = state
        .users
        .find_admin()
        .await?
        .ok_or(ApiError::NotFound("coach"))?;
    Ok(web::Json(Coach {
        id: admin.id,
        display_name: admin.display_name().to_owned(),
    }))
}

#[derive(Serialize, Deserialize)]
struct MetricsResponse {
    history: Vec<Metric>,
    summary: Vec<MetricSummary>,
}

#[get("/users/{user_id}/metrics")]
async fn get_metrics(
    req: HttpRequest,
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    session::check_owner(&session, *user_id)?;

    let history = state.metrics.history(*user_id).await?;
    let summary = metrics::summarize(&history);
    Ok(web::Json(MetricsResponse { history, summary }))
}

#[post("/users/{user_id}/metrics")]
async fn add_metric(
    req: HttpRequest,
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    entry: web::Json<NewMetric>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    session::check_owner(&session, *user_id)?;
    if state.users.get_user(*user_id).await?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    let metric = Metric::new(*user_id, entry.validate()?);
    state.metrics.add_metric(&metric).await?;
    info!(
        "Stored {} measurements for user {}",
        metric.values.len(),
        metric.user_id
    );
    Ok(HttpResponse::Created().json(metric))
}

#[derive(Serialize, Deserialize)]
struct UnreadCount {
    unread: u32,
}

#[get("/messages/unread")]
async fn unread_count(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    let unread = state.messages.unread_count(session.user_id()).await?;
    Ok(web::Json(UnreadCount { unread }))
}

/// Server-sent events carrying each new message of the conversation as JSON.
#[get("/messages/{other}/events")]
async fn conversation_events(
    req: HttpRequest,
    state: web::Data<AppState>,
    other: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    debug!(
        "User {} subscribed to conversation with {}",
        session.user_id(),
        other
    );

    let feed = state
        .messages
        .subscribe_conversation(session.user_id(), *other);
    let events = stream::unfold(feed, |mut feed| async move {
        let message = feed.next().await?;
        let event = serde_json::to_string(&message)
            .map(|json| web::Bytes::from(format!("data: {}\n\n", json)))
            .map_err(error::ErrorInternalServerError);
        Some((event, feed))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .streaming(events))
}

/// Opening a conversation marks the counterpart's messages as read.
#[get("/messages/{other}")]
async fn get_conversation(
    req: HttpRequest,
    state: web::Data<AppState>,
    other: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;

    let marked = state
        .messages
        .mark_conversation_read(session.user_id(), *other)
        .await?;
    if marked > 0 {
        debug!("Marked {} messages from {} as read", marked, other);
    }
    let conversation = state
        .messages
        .conversation(session.user_id(), *other)
        .await?;
    Ok(web::Json(conversation))
}

#[derive(Serialize, Deserialize)]
struct MessageBody {
    content: String,
}

#[post("/messages/{other}")]
async fn send_message(
    req: HttpRequest,
    state: web::Data<AppState>,
    other: web::Path<Uuid>,
    body: web::Json<MessageBody>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    if state.users.get_user(*other).await?.is_none() {
        return Err(ApiError::NotFound("recipient"));
    }

    let message = NewMessage::new(session.user_id(), *other, &body.content)?;
    let message = state.messages.send(message).await?;
    Ok(HttpResponse::Created().json(message))
}

#[get("/meals")]
async fn list_meals(
    state: web::Data<AppState>,
    filter: web::Query<MealFilter>,
) -> Result<impl Responder, ApiError> {
    let meals = state.meals.list_meals(&filter).await?;
    Ok(web::Json(meals))
}

#[post("/admin/meals")]
async fn add_meal(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<NewMeal>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    let meal = body.into_inner().into_meal()?;
    state.meals.add_meal(&meal).await?;
    info!("Added meal {} to the library", meal.name);
    Ok(HttpResponse::Created().json(meal))
}

#[post("/assessments")]
async fn submit_assessment(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<NewAssessment>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    let assessment = body.into_inner().into_assessment(session.user_id());
    state.assessments.submit(&assessment).await?;
    Ok(HttpResponse::Created().json(assessment))
}

/// Clients only see a plan once it is active; admins see drafts too.
#[get("/assessments/{id}/plan")]
async fn assessment_plan(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let session = session::require(&req, state.users.as_ref()).await?;
    let plan = state
        .plans
        .plan_for_assessment(*id)
        .await?
        .ok_or(ApiError::NotFound("plan"))?;
    session::check_owner(&session, plan.user_id)?;
    if !session.is_admin() && !plan.is_visible_to_client() {
        return Err(ApiError::NotFound("plan"));
    }
    Ok(web::Json(plan))
}

#[get("/admin/inbox")]
async fn inbox(req: HttpRequest, state: web::Data<AppState>) -> Result<impl Responder, ApiError> {
    let session = session::require_admin(&req, state.users.as_ref()).await?;
    let admin_id = session.user_id();

    let unread = state.messages.unread_by_sender(admin_id).await?;
    let mut entries = Vec::new();
    for user in state.users.list_users_except(admin_id).await? {
        let last_message = state.messages.last_message_between(admin_id, user.id).await?;
        entries.push(InboxEntry {
            user_id: user.id,
            display_name: user.display_name().to_owned(),
            last_message,
            unread: unread.get(&user.id).copied().unwrap_or(0),
        });
    }

    // Most recent conversations first, users never written to last
    let entries = entries
        .into_iter()
        .sorted_by(|a, b| {
            let a = a.last_message.as_ref().map(|m| m.created_at);
            let b = b.last_message.as_ref().map(|m| m.created_at);
            b.cmp(&a)
        })
        .collect::<Vec<_>>();
    Ok(web::Json(entries))
}

#[derive(Deserialize)]
struct StatusFilter {
    status: Option<AssessmentStatus>,
}

#[get("/admin/assessments")]
async fn list_assessments(
    req: HttpRequest,
    state: web::Data<AppState>,
    filter: web::Query<StatusFilter>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    let assessments = state.assessments.list(filter.status, None).await?;
    Ok(web::Json(assessments))
}

#[derive(Serialize, Deserialize)]
struct StatusBody {
    status: AssessmentStatus,
}

#[post("/admin/assessments/{id}/status")]
async fn set_assessment_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<StatusBody>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    let assessment = state.assessments.set_status(*id, body.status).await?;
    Ok(web::Json(assessment))
}

/// Drafts a plan for the assessment, which moves it to in progress.
#[post("/admin/assessments/{id}/plan")]
async fn create_plan(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    body: web::Json<NewPlan>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    let assessment = state
        .assessments
        .get_assessment(*id)
        .await?
        .ok_or(ApiError::NotFound("assessment"))?;
    let plan = body.into_inner().into_plan(&assessment)?;

    state
        .assessments
        .set_status(assessment.id, AssessmentStatus::InProgress)
        .await?;
    state.plans.create_plan(&plan).await?;
    Ok(HttpResponse::Created().json(plan))
}

#[derive(Deserialize)]
struct PlanFilter {
    status: Option<PlanStatus>,
}

#[get("/admin/plans")]
async fn list_plans(
    req: HttpRequest,
    state: web::Data<AppState>,
    filter: web::Query<PlanFilter>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    let plans = state.plans.list_plans(filter.status).await?;
    Ok(web::Json(plans))
}

/// Publishes the plan to the client and completes its assessment.
#[post("/admin/plans/{id}/activate")]
async fn activate_plan(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    let plan = state.plans.activate(*id).await?;
    state
        .assessments
        .set_status(plan.assessment_id, AssessmentStatus::Completed)
        .await?;
    Ok(web::Json(plan))
}

#[get("/admin/dashboard")]
async fn dashboard(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    session::require_admin(&req, state.users.as_ref()).await?;
    Ok(web::Json(DashboardStats {
        users: state.users.count_users().await?,
        pending: state
            .assessments
            .count_by_status(AssessmentStatus::Pending)
            .await?,
        completed: state
            .assessments
            .count_by_status(AssessmentStatus::Completed)
            .await?,
        active_plans: state.plans.count_by_status(PlanStatus::Active).await?,
        recent: state
            .assessments
            .list(None, Some(RECENT_ASSESSMENTS))
            .await?,
    }))
}
