//! # API REST
//!
//! REST API implementation for rxtrack.
//!
//! Handles:
//! - HTTP endpoints with axum, grouped per dashboard (doctor, patient, pharmacy)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS, caller identification)
//!
//! Callers identify themselves with the `x-user-id` header returned by signup or login.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    parse_user_id, AdherenceRes, ArmedReminderRes, ErrorRes, HealthRes, HealthService,
    IssuePrescriptionReq, ListMedicationsRes, ListPrescriptionsRes, LoginReq, MedicationRes,
    PrescriptionRes, RemindersRes, SetRemindersReq, SetRemindersRes, SignupReq, UserRes,
    UserRole, ValidateDosageReq, ValidateDosageRes, USER_ID_HEADER,
};
use rx_core::{
    dosage, AccountService, LocalStore, NewUser, Prescription, PrescriptionForm,
    PrescriptionService, PrescriptionStatus, ReminderScheduler, ReminderService, Role, RxError,
    User,
};

/// Application state shared across REST API handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    accounts: AccountService,
    prescriptions: PrescriptionService,
    reminders: ReminderService,
}

impl AppState {
    pub fn new(store: LocalStore, scheduler: ReminderScheduler) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            prescriptions: PrescriptionService::new(store.clone()),
            reminders: ReminderService::new(store, scheduler),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        signup,
        login,
        me,
        validate_dosage,
        issue_prescription,
        list_issued,
        list_medications,
        mark_taken,
        get_reminders,
        set_reminders,
        lookup_prescription,
        dispense_prescription,
    ),
    components(schemas(
        HealthRes,
        SignupReq,
        LoginReq,
        UserRes,
        UserRole,
        ValidateDosageReq,
        ValidateDosageRes,
        IssuePrescriptionReq,
        PrescriptionRes,
        api_shared::PrescriptionStatus,
        ListPrescriptionsRes,
        AdherenceRes,
        MedicationRes,
        ListMedicationsRes,
        SetRemindersReq,
        SetRemindersRes,
        ArmedReminderRes,
        RemindersRes,
        ErrorRes,
    ))
)]
struct ApiDoc;

/// Builds the REST router with Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/me", get(me))
        .route("/doctor/validate", post(validate_dosage))
        .route(
            "/doctor/prescriptions",
            get(list_issued).post(issue_prescription),
        )
        .route("/patient/prescriptions", get(list_medications))
        .route("/patient/prescriptions/:id/taken", post(mark_taken))
        .route(
            "/patient/prescriptions/:id/reminders",
            get(get_reminders).put(set_reminders),
        )
        .route("/pharmacy/prescriptions/:id", get(lookup_prescription))
        .route(
            "/pharmacy/prescriptions/:id/dispense",
            post(dispense_prescription),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(err: &RxError) -> StatusCode {
    match err {
        RxError::InvalidInput(_)
        | RxError::Text(_)
        | RxError::MissingSignupFields
        | RxError::MissingPrescriptionFields
        | RxError::InvalidReminderTimes
        | RxError::InvalidStoreKey(_) => StatusCode::BAD_REQUEST,
        RxError::InvalidCredentials | RxError::NotSignedIn | RxError::UnknownUser(_) => {
            StatusCode::UNAUTHORIZED
        }
        RxError::Forbidden { .. } | RxError::NotPrescriptionOwner(_) => StatusCode::FORBIDDEN,
        RxError::PrescriptionNotFound(_) => StatusCode::NOT_FOUND,
        RxError::DuplicateEmail | RxError::AlreadyDispensed(_) | RxError::AdherenceComplete(_) => {
            StatusCode::CONFLICT
        }
        RxError::ReferenceIdExhausted(_)
        | RxError::StorageDirCreation(_)
        | RxError::FileRead(_)
        | RxError::FileWrite(_)
        | RxError::Serialization { .. }
        | RxError::Deserialization { .. }
        | RxError::StoreLockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: RxError) -> ApiError {
    let status = status_for(&err);
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {:?}", err);
        "Internal error".to_string()
    } else {
        tracing::debug!(status = status.as_u16(), "Request rejected: {}", err);
        err.to_string()
    };
    (status, Json(ErrorRes { error: message }))
}

/// Resolves the `x-user-id` header to a stored user.
fn caller(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let header = headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok());
    let user_id = parse_user_id(header).map_err(|e| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorRes {
                error: e.to_string(),
            }),
        )
    })?;

    state
        .accounts
        .find_by_id(user_id)
        .map_err(api_error)?
        .ok_or_else(|| api_error(RxError::UnknownUser(user_id.to_string())))
}

fn role_from_wire(role: UserRole) -> Role {
    match role {
        UserRole::Doctor => Role::Doctor,
        UserRole::Patient => Role::Patient,
        UserRole::Pharmacy => Role::Pharmacy,
    }
}

fn role_to_wire(role: Role) -> UserRole {
    match role {
        Role::Doctor => UserRole::Doctor,
        Role::Patient => UserRole::Patient,
        Role::Pharmacy => UserRole::Pharmacy,
    }
}

fn user_res(user: &User) -> UserRes {
    UserRes {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: role_to_wire(user.role),
    }
}

fn prescription_res(p: Prescription) -> PrescriptionRes {
    PrescriptionRes {
        status: match p.status {
            PrescriptionStatus::Issued => api_shared::PrescriptionStatus::Issued,
            PrescriptionStatus::Dispensed => api_shared::PrescriptionStatus::Dispensed,
        },
        id: p.id,
        patient_name: p.patient_name,
        patient_age: p.patient_age,
        disease: p.disease,
        medicine: p.medicine,
        dosage: p.dosage,
        frequency: p.frequency,
        duration: p.duration,
        doctor_id: p.doctor_id,
        doctor_name: p.doctor_name,
        adherence_count: p.adherence_count,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupReq,
    responses(
        (status = 201, description = "User created", body = UserRes),
        (status = 400, description = "Missing or malformed fields", body = ErrorRes),
        (status = 409, description = "Email already registered", body = ErrorRes)
    )
)]
/// Register a new user
///
/// The returned `id` is the value to send in the `x-user-id` header.
#[axum::debug_handler]
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupReq>,
) -> Result<(StatusCode, Json<UserRes>), ApiError> {
    let user = state
        .accounts
        .sign_up(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            role: role_from_wire(req.role),
        })
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(user_res(&user))))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = UserRes),
        (status = 401, description = "Invalid credentials or role mismatch", body = ErrorRes)
    )
)]
/// Log in with email, password and role
#[axum::debug_handler]
async fn login(State(state): State<AppState>, Json(req): Json<LoginReq>) -> ApiResult<UserRes> {
    let user = state
        .accounts
        .login(&req.email, &req.password, role_from_wire(req.role))
        .map_err(api_error)?;
    Ok(Json(user_res(&user)))
}

#[utoipa::path(
    get,
    path = "/me",
    params(("x-user-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 200, description = "The calling user", body = UserRes),
        (status = 401, description = "Missing or unknown caller", body = ErrorRes)
    )
)]
/// Resolve the calling user
#[axum::debug_handler]
async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<UserRes> {
    let user = caller(&state, &headers)?;
    Ok(Json(user_res(&user)))
}

#[utoipa::path(
    post,
    path = "/doctor/validate",
    request_body = ValidateDosageReq,
    params(("x-user-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 200, description = "Advisory message", body = ValidateDosageRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes)
    )
)]
/// Check a dosage against the guideline table
///
/// Always answers with an advisory; warnings do not prevent issuing.
#[axum::debug_handler]
async fn validate_dosage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateDosageReq>,
) -> ApiResult<ValidateDosageRes> {
    let doctor = caller(&state, &headers)?;
    doctor.require_role(Role::Doctor).map_err(api_error)?;

    let advisory = dosage::validate(dosage::DosageQuery {
        medicine: &req.medicine,
        age: req.patient_age,
        dosage: req.dosage,
        frequency: req.frequency,
    });
    Ok(Json(ValidateDosageRes {
        message: advisory.message(),
        warning: advisory.is_warning(),
    }))
}

#[utoipa::path(
    post,
    path = "/doctor/prescriptions",
    request_body = IssuePrescriptionReq,
    params(("x-user-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 201, description = "Prescription issued", body = PrescriptionRes),
        (status = 400, description = "Missing fields", body = ErrorRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes)
    )
)]
/// Issue a new prescription
#[axum::debug_handler]
async fn issue_prescription(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IssuePrescriptionReq>,
) -> Result<(StatusCode, Json<PrescriptionRes>), ApiError> {
    let doctor = caller(&state, &headers)?;
    let form = PrescriptionForm {
        patient_name: req.patient_name,
        patient_age: req.patient_age,
        disease: req.disease,
        medicine: req.medicine,
        dosage: req.dosage,
        frequency: req.frequency,
        duration: req.duration,
    };

    let prescription = state
        .prescriptions
        .issue(&doctor, form)
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(prescription_res(prescription))))
}

#[utoipa::path(
    get,
    path = "/doctor/prescriptions",
    params(("x-user-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 200, description = "Prescriptions issued by the caller", body = ListPrescriptionsRes),
        (status = 403, description = "Caller is not a doctor", body = ErrorRes)
    )
)]
/// List the prescriptions the calling doctor has issued
#[axum::debug_handler]
async fn list_issued(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ListPrescriptionsRes> {
    let doctor = caller(&state, &headers)?;
    let prescriptions = state
        .prescriptions
        .issued_by(&doctor)
        .map_err(api_error)?
        .into_iter()
        .map(prescription_res)
        .collect();
    Ok(Json(ListPrescriptionsRes { prescriptions }))
}

#[utoipa::path(
    get,
    path = "/patient/prescriptions",
    params(("x-user-id" = String, Header, description = "Caller user id")),
    responses(
        (status = 200, description = "The caller's medications", body = ListMedicationsRes),
        (status = 403, description = "Caller is not a patient", body = ErrorRes)
    )
)]
/// List the calling patient's medications with adherence and reminders
#[axum::debug_handler]
async fn list_medications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<ListMedicationsRes> {
    let patient = caller(&state, &headers)?;
    let medications = state
        .prescriptions
        .for_patient(&patient)
        .map_err(api_error)?
        .into_iter()
        .map(|m| MedicationRes {
            adherence: AdherenceRes {
                taken: m.adherence.taken,
                total: m.adherence.total,
                percentage: m.adherence.percentage(),
            },
            reminders: m.reminders,
            prescription: prescription_res(m.prescription),
        })
        .collect();
    Ok(Json(ListMedicationsRes { medications }))
}

#[utoipa::path(
    post,
    path = "/patient/prescriptions/{id}/taken",
    params(
        ("id" = String, Path, description = "Prescription reference id"),
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "Dose recorded", body = PrescriptionRes),
        (status = 403, description = "Not the caller's prescription", body = ErrorRes),
        (status = 404, description = "Unknown prescription", body = ErrorRes),
        (status = 409, description = "All doses already recorded", body = ErrorRes)
    )
)]
/// Record one dose as taken
#[axum::debug_handler]
async fn mark_taken(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<PrescriptionRes> {
    let patient = caller(&state, &headers)?;
    let prescription = state
        .prescriptions
        .mark_taken(&patient, &id)
        .map_err(api_error)?;
    Ok(Json(prescription_res(prescription)))
}

#[utoipa::path(
    get,
    path = "/patient/prescriptions/{id}/reminders",
    params(
        ("id" = String, Path, description = "Prescription reference id"),
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "Reminder slots, one per daily dose", body = RemindersRes),
        (status = 403, description = "Not the caller's prescription", body = ErrorRes),
        (status = 404, description = "Unknown prescription", body = ErrorRes)
    )
)]
/// Read the reminder slots for a prescription
#[axum::debug_handler]
async fn get_reminders(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<RemindersRes> {
    let patient = caller(&state, &headers)?;
    let prescription = state.prescriptions.find(&id).map_err(api_error)?;
    let slots = state
        .reminders
        .reminder_slots(&patient, &prescription.id)
        .map_err(api_error)?;
    Ok(Json(RemindersRes {
        prescription_id: prescription.id,
        slots,
    }))
}

#[utoipa::path(
    put,
    path = "/patient/prescriptions/{id}/reminders",
    request_body = SetRemindersReq,
    params(
        ("id" = String, Path, description = "Prescription reference id"),
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "Reminders saved and armed", body = SetRemindersRes),
        (status = 400, description = "Times missing or not HH:MM", body = ErrorRes),
        (status = 403, description = "Not the caller's prescription", body = ErrorRes),
        (status = 404, description = "Unknown prescription", body = ErrorRes)
    )
)]
/// Save the reminder times for a prescription and arm them
#[axum::debug_handler]
async fn set_reminders(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetRemindersReq>,
) -> ApiResult<SetRemindersRes> {
    let patient = caller(&state, &headers)?;
    let prescription = state.prescriptions.find(&id).map_err(api_error)?;
    let armed = state
        .reminders
        .set_reminders(&patient, &prescription.id, &req.times)
        .map_err(api_error)?;

    Ok(Json(SetRemindersRes {
        prescription_id: prescription.id,
        armed: armed
            .iter()
            .map(|r| ArmedReminderRes {
                tag: r.tag.clone(),
                time: r.time.to_string(),
                delay_secs: r.delay.as_secs(),
            })
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/pharmacy/prescriptions/{id}",
    params(
        ("id" = String, Path, description = "Prescription reference id, case-insensitive"),
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "Prescription details", body = PrescriptionRes),
        (status = 403, description = "Caller is not a pharmacy", body = ErrorRes),
        (status = 404, description = "Prescription ID not found", body = ErrorRes)
    )
)]
/// Verify a prescription by reference id
#[axum::debug_handler]
async fn lookup_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<PrescriptionRes> {
    let pharmacy = caller(&state, &headers)?;
    let prescription = state
        .prescriptions
        .lookup(&pharmacy, &id)
        .map_err(api_error)?;
    Ok(Json(prescription_res(prescription)))
}

#[utoipa::path(
    post,
    path = "/pharmacy/prescriptions/{id}/dispense",
    params(
        ("id" = String, Path, description = "Prescription reference id, case-insensitive"),
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "Prescription dispensed", body = PrescriptionRes),
        (status = 403, description = "Caller is not a pharmacy", body = ErrorRes),
        (status = 404, description = "Prescription ID not found", body = ErrorRes),
        (status = 409, description = "Already dispensed", body = ErrorRes)
    )
)]
/// Mark a prescription as dispensed
#[axum::debug_handler]
async fn dispense_prescription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<PrescriptionRes> {
    let pharmacy = caller(&state, &headers)?;
    let prescription = state
        .prescriptions
        .dispense(&pharmacy, &id)
        .map_err(api_error)?;
    Ok(Json(prescription_res(prescription)))
}
