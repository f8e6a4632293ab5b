//! Server-side driver for the store address cascade.
//!
//! Each open store-creation form owns one [`AddressCascade`], registered
//! under a random form id that the page carries in a hidden input. HTMX
//! requests for the same form may overlap, so every selection runs as:
//!
//! ```text
//! lock → select_* → unlock → fetch children (no lock held) → lock → apply_* → view
//! ```
//!
//! The cascade's generation tickets make the last selection win no matter
//! which fetch finishes first.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use ocop_core::{
    AddressCascade, Applied, District, DistrictId, Province, ProvinceId, ResolvedAddress, Ward,
    WardId,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::marketplace::{MarketplaceClient, MarketplaceError};

/// Forms left untouched this long are forgotten.
const FORM_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
const MAX_OPEN_FORMS: u64 = 10_000;

/// The form id is unknown, usually because it sat idle too long.
#[derive(Debug, Clone, Copy, Error)]
#[error("address form expired")]
pub struct FormExpired;

/// Source of province, district, and ward lists.
pub trait DirectoryLookup: Send + Sync {
    type Error: std::fmt::Display + Send;

    fn list_provinces(&self) -> impl Future<Output = Result<Vec<Province>, Self::Error>> + Send;

    fn list_districts(
        &self,
        province: &ProvinceId,
    ) -> impl Future<Output = Result<Vec<District>, Self::Error>> + Send;

    fn list_wards(
        &self,
        district: &DistrictId,
    ) -> impl Future<Output = Result<Vec<Ward>, Self::Error>> + Send;
}

impl DirectoryLookup for MarketplaceClient {
    type Error = MarketplaceError;

    fn list_provinces(&self) -> impl Future<Output = Result<Vec<Province>, Self::Error>> + Send {
        Self::list_provinces(self)
    }

    fn list_districts(
        &self,
        province: &ProvinceId,
    ) -> impl Future<Output = Result<Vec<District>, Self::Error>> + Send {
        Self::list_districts(self, province)
    }

    fn list_wards(
        &self,
        district: &DistrictId,
    ) -> impl Future<Output = Result<Vec<Ward>, Self::Error>> + Send {
        Self::list_wards(self, district)
    }
}

/// Snapshot of one form's cascade, ready for rendering.
#[derive(Debug, Clone)]
pub struct CascadeView {
    pub form_id: Uuid,
    pub provinces: Vec<Province>,
    pub districts: Vec<District>,
    pub wards: Vec<Ward>,
    pub province: Option<ProvinceId>,
    pub district: Option<DistrictId>,
    pub ward: Option<WardId>,
    pub resolved: ResolvedAddress,
    pub complete: bool,
    /// Set when a list failed to load during this request.
    pub notice: Option<String>,
}

impl CascadeView {
    fn capture(form_id: Uuid, cascade: &AddressCascade, notice: Option<String>) -> Self {
        Self {
            form_id,
            provinces: cascade.provinces().to_vec(),
            districts: cascade.districts().to_vec(),
            wards: cascade.wards().to_vec(),
            province: cascade.selected_province().cloned(),
            district: cascade.selected_district().cloned(),
            ward: cascade.selected_ward().cloned(),
            resolved: cascade.resolve(),
            complete: cascade.is_complete(),
            notice,
        }
    }

    // Templates compare by string so they never move ids out of the lists.

    #[must_use]
    pub fn is_province_selected(&self, id: &str) -> bool {
        self.province.as_ref().is_some_and(|p| p.as_str() == id)
    }

    #[must_use]
    pub fn is_district_selected(&self, id: &str) -> bool {
        self.district.as_ref().is_some_and(|d| d.as_str() == id)
    }

    #[must_use]
    pub fn is_ward_selected(&self, id: &str) -> bool {
        self.ward.as_ref().is_some_and(|w| w.as_str() == id)
    }
}

/// Registry of open address forms.
#[derive(Clone)]
pub struct AddressForms {
    forms: Cache<Uuid, Arc<Mutex<AddressCascade>>>,
}

impl Default for AddressForms {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressForms {
    #[must_use]
    pub fn new() -> Self {
        Self {
            forms: Cache::builder()
                .max_capacity(MAX_OPEN_FORMS)
                .time_to_idle(FORM_IDLE_TTL)
                .build(),
        }
    }

    async fn get(&self, form_id: Uuid) -> Result<Arc<Mutex<AddressCascade>>, FormExpired> {
        self.forms.get(&form_id).await.ok_or(FormExpired)
    }

    /// Open a fresh form and load the province list.
    pub async fn open<D: DirectoryLookup>(&self, directory: &D) -> CascadeView {
        let form_id = Uuid::new_v4();
        let mut cascade = AddressCascade::new();
        let ticket = cascade.begin_provinces();
        let form = Arc::new(Mutex::new(cascade));
        self.forms.insert(form_id, Arc::clone(&form)).await;

        let result = directory.list_provinces().await;
        let error = error_text(&result);

        let mut cascade = form.lock().await;
        let applied = cascade.apply_provinces(&ticket, result);
        let notice = report(applied, error, "provinces");
        CascadeView::capture(form_id, &cascade, notice)
    }

    /// Current state of a form.
    ///
    /// # Errors
    ///
    /// Returns `FormExpired` if the form id is unknown.
    pub async fn view(&self, form_id: Uuid) -> Result<CascadeView, FormExpired> {
        let form = self.get(form_id).await?;
        let cascade = form.lock().await;
        Ok(CascadeView::capture(form_id, &cascade, None))
    }

    /// Select (or clear) the province and load its districts.
    ///
    /// # Errors
    ///
    /// Returns `FormExpired` if the form id is unknown.
    pub async fn select_province<D: DirectoryLookup>(
        &self,
        directory: &D,
        form_id: Uuid,
        province: Option<ProvinceId>,
    ) -> Result<CascadeView, FormExpired> {
        let form = self.get(form_id).await?;
        let ticket = form.lock().await.select_province(province);

        let mut notice = None;
        if let Some(ticket) = ticket {
            let result = directory.list_districts(ticket.scope()).await;
            let error = error_text(&result);
            let applied = form.lock().await.apply_districts(&ticket, result);
            notice = report(applied, error, "districts");
        }

        let cascade = form.lock().await;
        Ok(CascadeView::capture(form_id, &cascade, notice))
    }

    /// Select (or clear) the district and load its wards.
    ///
    /// A district outside the form's current list is ignored and the
    /// current state is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `FormExpired` if the form id is unknown.
    pub async fn select_district<D: DirectoryLookup>(
        &self,
        directory: &D,
        form_id: Uuid,
        district: Option<DistrictId>,
    ) -> Result<CascadeView, FormExpired> {
        let form = self.get(form_id).await?;
        let ticket = form.lock().await.select_district(district);

        let mut notice = None;
        if let Some(ticket) = ticket {
            let result = directory.list_wards(ticket.scope()).await;
            let error = error_text(&result);
            let applied = form.lock().await.apply_wards(&ticket, result);
            notice = report(applied, error, "wards");
        }

        let cascade = form.lock().await;
        Ok(CascadeView::capture(form_id, &cascade, notice))
    }

    /// Select (or clear) the ward. A ward outside the loaded list is ignored.
    ///
    /// # Errors
    ///
    /// Returns `FormExpired` if the form id is unknown.
    pub async fn select_ward(
        &self,
        form_id: Uuid,
        ward: Option<WardId>,
    ) -> Result<CascadeView, FormExpired> {
        let form = self.get(form_id).await?;
        let mut cascade = form.lock().await;
        if !cascade.select_ward(ward) {
            debug!("Ignored ward outside the loaded list");
        }
        Ok(CascadeView::capture(form_id, &cascade, None))
    }

    /// Forget a form after a successful submission.
    pub async fn close(&self, form_id: Uuid) {
        self.forms.invalidate(&form_id).await;
    }
}

fn error_text<T, E: std::fmt::Display>(result: &Result<T, E>) -> Option<String> {
    result.as_ref().err().map(ToString::to_string)
}

/// Log the outcome of a list fetch and build the notice for a real failure.
fn report(applied: Applied, error: Option<String>, level: &str) -> Option<String> {
    match applied {
        Applied::Stale => {
            debug!(list = level, failed = error.is_some(), "Discarded superseded address list");
            None
        }
        Applied::Failed => {
            warn!(
                error = error.as_deref().unwrap_or_default(),
                list = level,
                "Failed to load address list"
            );
            Some(format!("Could not load {level}, please try again"))
        }
        Applied::Loaded(count) => {
            debug!(list = level, count, "Loaded address list");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use tokio::sync::Notify;

    use super::*;

    /// In-memory directory. Districts of a "gated" province are held back
    /// until the test releases them.
    #[derive(Default)]
    struct FakeDirectory {
        districts: HashMap<String, Vec<District>>,
        wards: HashMap<String, Vec<Ward>>,
        failing_wards: bool,
        failing_districts: bool,
        gated: Option<(String, Arc<Notify>, Arc<Notify>)>,
    }

    impl FakeDirectory {
        fn vietnam() -> Self {
            let mut districts = HashMap::new();
            districts.insert(
                "1".to_string(),
                vec![District {
                    id: DistrictId::new("10"),
                    name: "Dong Da".to_string(),
                    province_id: Some(ProvinceId::new("1")),
                }],
            );
            districts.insert(
                "79".to_string(),
                vec![District {
                    id: DistrictId::new("760"),
                    name: "Quan 1".to_string(),
                    province_id: Some(ProvinceId::new("79")),
                }],
            );

            let mut wards = HashMap::new();
            wards.insert(
                "10".to_string(),
                vec![Ward {
                    id: WardId::new("100"),
                    name: "Lang".to_string(),
                    district_id: Some(DistrictId::new("10")),
                }],
            );

            Self {
                districts,
                wards,
                ..Self::default()
            }
        }
    }

    impl DirectoryLookup for FakeDirectory {
        type Error = String;

        async fn list_provinces(&self) -> Result<Vec<Province>, String> {
            Ok(vec![
                Province {
                    id: ProvinceId::new("1"),
                    name: "Hanoi".to_string(),
                },
                Province {
                    id: ProvinceId::new("79"),
                    name: "Ho Chi Minh".to_string(),
                },
            ])
        }

        async fn list_districts(&self, province: &ProvinceId) -> Result<Vec<District>, String> {
            if let Some((gated, entered, release)) = &self.gated
                && gated == province.as_str()
            {
                entered.notify_one();
                release.notified().await;
            }
            if self.failing_districts && province.as_str() == "1" {
                return Err("directory unavailable".to_string());
            }
            Ok(self
                .districts
                .get(province.as_str())
                .cloned()
                .unwrap_or_default())
        }

        async fn list_wards(&self, district: &DistrictId) -> Result<Vec<Ward>, String> {
            if self.failing_wards {
                return Err("directory unavailable".to_string());
            }
            Ok(self.wards.get(district.as_str()).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_open_loads_provinces() {
        let forms = AddressForms::new();
        let view = forms.open(&FakeDirectory::vietnam()).await;

        assert_eq!(view.provinces.len(), 2);
        assert!(view.districts.is_empty());
        assert!(view.notice.is_none());
        assert!(forms.view(view.form_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_full_selection_resolves_names() {
        let directory = FakeDirectory::vietnam();
        let forms = AddressForms::new();
        let id = forms.open(&directory).await.form_id;

        forms
            .select_province(&directory, id, Some(ProvinceId::new("1")))
            .await
            .unwrap();
        forms
            .select_district(&directory, id, Some(DistrictId::new("10")))
            .await
            .unwrap();
        let view = forms.select_ward(id, Some(WardId::new("100"))).await.unwrap();

        assert!(view.complete);
        assert_eq!(view.resolved.province_name, "Hanoi");
        assert_eq!(view.resolved.district_name, "Dong Da");
        assert_eq!(view.resolved.ward_name, "Lang");
    }

    #[tokio::test]
    async fn test_clearing_province_empties_lower_levels() {
        let directory = FakeDirectory::vietnam();
        let forms = AddressForms::new();
        let id = forms.open(&directory).await.form_id;

        forms
            .select_province(&directory, id, Some(ProvinceId::new("1")))
            .await
            .unwrap();
        forms
            .select_district(&directory, id, Some(DistrictId::new("10")))
            .await
            .unwrap();
        let view = forms.select_province(&directory, id, None).await.unwrap();

        assert!(view.province.is_none());
        assert!(view.district.is_none());
        assert!(view.districts.is_empty());
        assert!(view.wards.is_empty());
    }

    #[tokio::test]
    async fn test_ward_failure_shows_notice_and_keeps_district() {
        let directory = FakeDirectory {
            failing_wards: true,
            ..FakeDirectory::vietnam()
        };
        let forms = AddressForms::new();
        let id = forms.open(&directory).await.form_id;

        forms
            .select_province(&directory, id, Some(ProvinceId::new("1")))
            .await
            .unwrap();
        let view = forms
            .select_district(&directory, id, Some(DistrictId::new("10")))
            .await
            .unwrap();

        assert!(view.notice.is_some());
        assert!(view.wards.is_empty());
        assert_eq!(view.district.as_ref().map(DistrictId::as_str), Some("10"));
        assert_eq!(view.districts.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_response_for_earlier_selection_is_discarded() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let directory = Arc::new(FakeDirectory {
            gated: Some(("1".to_string(), Arc::clone(&entered), Arc::clone(&release))),
            ..FakeDirectory::vietnam()
        });
        let forms = AddressForms::new();
        let id = forms.open(directory.as_ref()).await.form_id;

        // First selection stalls inside the directory call.
        let slow = tokio::spawn({
            let forms = forms.clone();
            let directory = Arc::clone(&directory);
            async move {
                forms
                    .select_province(directory.as_ref(), id, Some(ProvinceId::new("1")))
                    .await
            }
        });
        entered.notified().await;

        // The user changes their mind before it answers.
        let fast = forms
            .select_province(directory.as_ref(), id, Some(ProvinceId::new("79")))
            .await
            .unwrap();
        assert_eq!(fast.districts[0].name, "Quan 1");

        release.notify_one();
        let late = slow.await.unwrap().unwrap();

        assert_eq!(late.province.as_ref().map(ProvinceId::as_str), Some("79"));
        assert_eq!(late.districts.len(), 1);
        assert_eq!(late.districts[0].name, "Quan 1");
        assert!(late.notice.is_none());
    }

    #[tokio::test]
    async fn test_superseded_failure_shows_no_notice() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let directory = Arc::new(FakeDirectory {
            gated: Some(("1".to_string(), Arc::clone(&entered), Arc::clone(&release))),
            failing_districts: true,
            ..FakeDirectory::vietnam()
        });
        let forms = AddressForms::new();
        let id = forms.open(directory.as_ref()).await.form_id;

        let slow = tokio::spawn({
            let forms = forms.clone();
            let directory = Arc::clone(&directory);
            async move {
                forms
                    .select_province(directory.as_ref(), id, Some(ProvinceId::new("1")))
                    .await
            }
        });
        entered.notified().await;
        forms
            .select_province(directory.as_ref(), id, Some(ProvinceId::new("79")))
            .await
            .unwrap();

        release.notify_one();
        let late = slow.await.unwrap().unwrap();

        assert!(late.notice.is_none());
        assert_eq!(late.districts[0].name, "Quan 1");
    }

    #[tokio::test]
    async fn test_current_failure_shows_notice() {
        let directory = FakeDirectory {
            failing_districts: true,
            ..FakeDirectory::vietnam()
        };
        let forms = AddressForms::new();
        let id = forms.open(&directory).await.form_id;

        let view = forms
            .select_province(&directory, id, Some(ProvinceId::new("1")))
            .await
            .unwrap();

        assert_eq!(view.notice.as_deref(), Some("Could not load districts, please try again"));
        assert!(view.districts.is_empty());
    }

    #[tokio::test]
    async fn test_district_from_previous_province_is_ignored() {
        let directory = FakeDirectory::vietnam();
        let forms = AddressForms::new();
        let id = forms.open(&directory).await.form_id;

        forms
            .select_province(&directory, id, Some(ProvinceId::new("1")))
            .await
            .unwrap();
        let view = forms
            .select_district(&directory, id, Some(DistrictId::new("760")))
            .await
            .unwrap();

        assert!(view.district.is_none());
        assert!(view.wards.is_empty());
        assert!(view.notice.is_none());

        let view = forms.select_ward(id, Some(WardId::new("100"))).await.unwrap();
        assert!(view.ward.is_none());
        assert!(!view.complete);
    }

    #[tokio::test]
    async fn test_unknown_and_closed_forms_are_expired() {
        let directory = FakeDirectory::vietnam();
        let forms = AddressForms::new();

        assert!(forms.view(Uuid::new_v4()).await.is_err());

        let id = forms.open(&directory).await.form_id;
        forms.close(id).await;
        assert!(
            forms
                .select_province(&directory, id, Some(ProvinceId::new("1")))
                .await
                .is_err()
        );
    }
}
