//! Store onboarding route handlers.
//!
//! The address part of the form is a province → district → ward cascade
//! held server-side (see [`crate::services::address`]). Each select posts
//! its value over HTMX and gets the whole address block back, so lower
//! levels reset together with their lists.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use ocop_core::{DistrictId, Email, ProvinceId, StoreId, User, WardId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::filters;
use crate::marketplace::{CreateStoreRequest, MarketplaceError};
use crate::menu::Layout;
use crate::middleware::{RequireStoreCandidate, sign_in, sign_out};
use crate::models::{AuthSession, AuthState};
use crate::services::address::CascadeView;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Store form submission.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoreForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

/// Submission: the address form id plus the text fields.
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub form_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

impl SubmitForm {
    fn split(self) -> (Uuid, StoreForm) {
        (
            self.form_id,
            StoreForm {
                name: self.name,
                description: self.description,
                phone: self.phone,
                email: self.email,
                address: self.address,
            },
        )
    }
}

/// A province select change.
#[derive(Debug, Deserialize)]
pub struct ProvinceSelection {
    pub form_id: Uuid,
    #[serde(default)]
    pub province: String,
}

/// A district select change.
#[derive(Debug, Deserialize)]
pub struct DistrictSelection {
    pub form_id: Uuid,
    #[serde(default)]
    pub district: String,
}

/// A ward select change.
#[derive(Debug, Deserialize)]
pub struct WardSelection {
    pub form_id: Uuid,
    #[serde(default)]
    pub ward: String,
}

/// Blank select values mean "nothing selected".
fn non_blank(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

// =============================================================================
// Templates
// =============================================================================

/// Store creation page template.
#[derive(Template, WebTemplate)]
#[template(path = "store/create.html")]
pub struct StoreCreateTemplate {
    pub layout: Layout,
    pub values: StoreForm,
    pub view: CascadeView,
    pub error: Option<String>,
}

/// Address block fragment, swapped in after each selection.
#[derive(Template, WebTemplate)]
#[template(path = "partials/address_cascade.html")]
pub struct AddressCascadeTemplate {
    pub view: CascadeView,
}

// =============================================================================
// Validation
// =============================================================================

/// Check the submission against the address state.
///
/// Returns the payload for the marketplace, or a message for the user.
fn validate(
    form: &StoreForm,
    view: &CascadeView,
) -> std::result::Result<CreateStoreRequest, &'static str> {
    let required = [&form.name, &form.phone, &form.email, &form.address];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err("Please fill in the store name, phone, email and address.");
    }
    let email = Email::parse(&form.email).map_err(|_| "Please enter a valid email address.")?;
    if !view.complete {
        return Err("Please choose a province, district and ward.");
    }

    let resolved = &view.resolved;
    Ok(CreateStoreRequest {
        name: form.name.trim().to_string(),
        description: form.description.trim().to_string(),
        phone: form.phone.trim().to_string(),
        email: email.into_inner(),
        address: form.address.trim().to_string(),
        province: resolved.province.clone(),
        province_name: resolved.province_name.clone(),
        district: resolved.district.clone(),
        district_name: resolved.district_name.clone(),
        ward: resolved.ward.clone(),
        ward_name: resolved.ward_name.clone(),
    })
}

/// The user snapshot after store creation.
///
/// Prefers a fresh profile from the marketplace; if that fails or lags
/// behind, derives a new snapshot carrying the created store.
fn with_store(refreshed: Option<User>, previous: &User, store_id: StoreId) -> User {
    match refreshed {
        Some(user) if user.store().is_some() => user,
        Some(user) => User {
            store_id: Some(store_id),
            ..user
        },
        None => User {
            store_id: Some(store_id),
            ..previous.clone()
        },
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display the store creation form.
#[instrument(skip_all)]
pub async fn new_store(
    State(state): State<AppState>,
    RequireStoreCandidate(auth): RequireStoreCandidate,
    layout: Layout,
) -> impl IntoResponse {
    let view = state.address_forms().open(state.marketplace()).await;
    let user = auth.user();

    StoreCreateTemplate {
        layout,
        values: StoreForm {
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            ..StoreForm::default()
        },
        view,
        error: None,
    }
}

/// Province selected or cleared.
#[instrument(skip_all, fields(form_id = %form.form_id))]
pub async fn select_province(
    State(state): State<AppState>,
    RequireStoreCandidate(_auth): RequireStoreCandidate,
    Form(form): Form<ProvinceSelection>,
) -> Result<AddressCascadeTemplate> {
    let province = non_blank(&form.province).map(ProvinceId::new);
    let view = state
        .address_forms()
        .select_province(state.marketplace(), form.form_id, province)
        .await?;
    Ok(AddressCascadeTemplate { view })
}

/// District selected or cleared.
#[instrument(skip_all, fields(form_id = %form.form_id))]
pub async fn select_district(
    State(state): State<AppState>,
    RequireStoreCandidate(_auth): RequireStoreCandidate,
    Form(form): Form<DistrictSelection>,
) -> Result<AddressCascadeTemplate> {
    let district = non_blank(&form.district).map(DistrictId::new);
    let view = state
        .address_forms()
        .select_district(state.marketplace(), form.form_id, district)
        .await?;
    Ok(AddressCascadeTemplate { view })
}

/// Ward selected or cleared. Nothing depends on it, so nothing is re-rendered.
#[instrument(skip_all, fields(form_id = %form.form_id))]
pub async fn select_ward(
    State(state): State<AppState>,
    RequireStoreCandidate(_auth): RequireStoreCandidate,
    Form(form): Form<WardSelection>,
) -> Result<StatusCode> {
    let ward = non_blank(&form.ward).map(WardId::new);
    state
        .address_forms()
        .select_ward(form.form_id, ward)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle store form submission.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireStoreCandidate(auth): RequireStoreCandidate,
    layout: Layout,
    Form(form): Form<SubmitForm>,
) -> Result<Response> {
    let (form_id, values) = form.split();
    let view = state.address_forms().view(form_id).await?;

    let rerender = |status: StatusCode, error: String, view: CascadeView, values: StoreForm| {
        (
            status,
            StoreCreateTemplate {
                layout,
                values,
                view,
                error: Some(error),
            },
        )
            .into_response()
    };

    let request = match validate(&values, &view) {
        Ok(request) => request,
        Err(message) => {
            return Ok(rerender(
                StatusCode::UNPROCESSABLE_ENTITY,
                message.to_string(),
                view,
                values,
            ));
        }
    };

    let store = match state.marketplace().create_store(auth.token(), &request).await {
        Ok(store) => store,
        Err(MarketplaceError::Unauthorized) => {
            sign_out(&session).await?;
            return Ok(Redirect::to("/auth/login?error=session_expired").into_response());
        }
        Err(MarketplaceError::Status { status, message }) if (400..500).contains(&status) => {
            tracing::warn!(status, "Store creation rejected: {}", message);
            return Ok(rerender(
                StatusCode::UNPROCESSABLE_ENTITY,
                message,
                view,
                values,
            ));
        }
        Err(e) => {
            tracing::error!("Store creation failed: {}", e);
            return Ok(rerender(
                StatusCode::BAD_GATEWAY,
                "The marketplace is unavailable right now, please try again.".to_string(),
                view,
                values,
            ));
        }
    };

    tracing::info!(store_id = %store.id, store = %store.name, "Store created");
    refresh_session(&state, &session, &auth, store.id).await?;
    state.address_forms().close(form_id).await;

    Ok(Redirect::to("/account?success=store_created").into_response())
}

/// Replace the session snapshot with one that knows about the new store.
async fn refresh_session(
    state: &AppState,
    session: &Session,
    auth: &AuthSession,
    store_id: StoreId,
) -> Result<()> {
    let refreshed = state
        .marketplace()
        .current_user(auth.token())
        .await
        .inspect_err(|e| tracing::warn!("Failed to refresh profile after store creation: {}", e))
        .ok();
    let user = with_store(refreshed, auth.user(), store_id);

    sign_in(session, &AuthState::login(auth.token().clone(), user)).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ocop_core::{ResolvedAddress, RoleSet, UserId};

    use super::*;

    fn view(complete: bool) -> CascadeView {
        CascadeView {
            form_id: Uuid::nil(),
            provinces: Vec::new(),
            districts: Vec::new(),
            wards: Vec::new(),
            province: complete.then(|| ProvinceId::new("1")),
            district: complete.then(|| DistrictId::new("10")),
            ward: complete.then(|| WardId::new("100")),
            resolved: if complete {
                ResolvedAddress {
                    province: "1".to_string(),
                    province_name: "Ha Noi".to_string(),
                    district: "10".to_string(),
                    district_name: "Dong Da".to_string(),
                    ward: "100".to_string(),
                    ward_name: "Lang".to_string(),
                }
            } else {
                ResolvedAddress::default()
            },
            complete,
            notice: None,
        }
    }

    fn form() -> StoreForm {
        StoreForm {
            name: " Tra Shan Tuyet ".to_string(),
            description: String::new(),
            phone: "0912345678".to_string(),
            email: "shop@ocop.vn".to_string(),
            address: "12 Lang Ha".to_string(),
        }
    }

    fn user(store: Option<&str>) -> User {
        User {
            id: UserId::new("u-1"),
            username: "lan".to_string(),
            name: "Lan".to_string(),
            email: "lan@ocop.vn".to_string(),
            roles: RoleSet::default(),
            avatar: None,
            phone: None,
            store_id: store.map(StoreId::new),
        }
    }

    #[test]
    fn test_valid_submission_carries_resolved_names() {
        let request = validate(&form(), &view(true)).unwrap();
        assert_eq!(request.name, "Tra Shan Tuyet");
        assert_eq!(request.province_name, "Ha Noi");
        assert_eq!(request.district, "10");
        assert_eq!(request.ward_name, "Lang");
    }

    #[test]
    fn test_incomplete_address_rejected() {
        assert_eq!(
            validate(&form(), &view(false)).err(),
            Some("Please choose a province, district and ward.")
        );
    }

    #[test]
    fn test_missing_and_malformed_fields_rejected() {
        let mut missing = form();
        missing.phone = " ".to_string();
        assert!(validate(&missing, &view(true)).is_err());

        let mut bad_email = form();
        bad_email.email = "shop at ocop".to_string();
        assert_eq!(
            validate(&bad_email, &view(true)).err(),
            Some("Please enter a valid email address.")
        );
    }

    #[test]
    fn test_snapshot_after_store_creation() {
        let previous = user(None);

        let fresh = with_store(Some(user(Some("s-9"))), &previous, StoreId::new("s-1"));
        assert_eq!(fresh.store_id, Some(StoreId::new("s-9")));

        let lagging = with_store(Some(user(None)), &previous, StoreId::new("s-1"));
        assert_eq!(lagging.store_id, Some(StoreId::new("s-1")));

        let offline = with_store(None, &previous, StoreId::new("s-1"));
        assert!(ocop_core::is_seller(&offline));
        assert_eq!(previous.store_id, None);
    }

    #[test]
    fn test_blank_selection_is_none() {
        assert_eq!(non_blank("  "), None);
        assert_eq!(non_blank(" 79 "), Some("79"));
    }
}
