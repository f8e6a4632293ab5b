//! Province / district / ward hierarchy and the dependent selection cascade.
//!
//! The store-creation form picks an address in three dependent steps. Any
//! write to a level resets everything below it, and the child list for the
//! new parent is fetched again. Fetches are asynchronous and may overlap,
//! so every selection hands out a [`Ticket`] carrying a per-level generation
//! number; a fetch result is applied only while its ticket is current.
//!
//! ```text
//! select_province(p) ──► districts cleared, wards cleared ──► Ticket<ProvinceId>
//! select_district(d) ──► wards cleared                      ──► Ticket<DistrictId>
//! select_ward(w)     ──► (terminal)
//! ```
//!
//! A district or ward is accepted only if it is in the list currently loaded
//! for its parent. Anything else is a selection made against an older list
//! and is ignored.
//!
//! The cascade performs no I/O itself; the caller runs the fetch a ticket
//! asks for and feeds the result back through the matching `apply_*` method.

use serde::{Deserialize, Serialize};

use crate::types::{DistrictId, ProvinceId, WardId};

/// Top level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub id: ProvinceId,
    pub name: String,
}

/// Second level; belongs to a province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub id: DistrictId,
    pub name: String,
    #[serde(default)]
    pub province_id: Option<ProvinceId>,
}

/// Third level; belongs to a district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ward {
    pub id: WardId,
    pub name: String,
    #[serde(default)]
    pub district_id: Option<DistrictId>,
}

/// Permission to apply one fetch result.
///
/// `scope` is the parent id the fetch must be run for (`()` for the
/// province list, which has no parent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<P> {
    scope: P,
    generation: u64,
}

impl<P> Ticket<P> {
    /// The parent id to fetch children for.
    #[must_use]
    pub const fn scope(&self) -> &P {
        &self.scope
    }

    /// Generation number of the selection that issued this ticket.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a fetch result handed to an `apply_*` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The list was stored; holds the number of entries kept.
    Loaded(usize),
    /// The fetch failed; the level now shows an empty list.
    Failed,
    /// A newer selection superseded the ticket; nothing changed.
    Stale,
}

/// Address ids and their display names, ready for submission.
///
/// Ids are authoritative. Names are denormalized display data and are empty
/// when the id cannot be found in the list currently loaded for its level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAddress {
    pub province: String,
    pub province_name: String,
    pub district: String,
    pub district_name: String,
    pub ward: String,
    pub ward_name: String,
}

/// Three-level dependent selection state.
#[derive(Debug, Clone, Default)]
pub struct AddressCascade {
    provinces: Vec<Province>,
    districts: Vec<District>,
    wards: Vec<Ward>,
    province: Option<ProvinceId>,
    district: Option<DistrictId>,
    ward: Option<WardId>,
    province_gen: u64,
    district_gen: u64,
    ward_gen: u64,
}

impl AddressCascade {
    /// An empty cascade with nothing loaded or selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Selections
    // ─────────────────────────────────────────────────────────────────────

    /// Start (or restart) loading the province list.
    pub fn begin_provinces(&mut self) -> Ticket<()> {
        self.province_gen = self.province_gen.wrapping_add(1);
        Ticket {
            scope: (),
            generation: self.province_gen,
        }
    }

    /// Select or clear the province.
    ///
    /// Always resets district and ward, even when the province is unchanged.
    /// Returns the district fetch to run, or `None` when the province was
    /// cleared (an empty scope never fetches).
    pub fn select_province(&mut self, province: Option<ProvinceId>) -> Option<Ticket<ProvinceId>> {
        let province = province.filter(|id| !id.is_blank());

        self.province.clone_from(&province);
        self.district = None;
        self.ward = None;
        self.districts.clear();
        self.wards.clear();
        self.district_gen = self.district_gen.wrapping_add(1);
        self.ward_gen = self.ward_gen.wrapping_add(1);

        province.map(|scope| Ticket {
            scope,
            generation: self.district_gen,
        })
    }

    /// Select or clear the district. Resets the ward; leaves the province alone.
    ///
    /// A district that is not in the loaded list for the selected province is
    /// ignored: nothing changes and no ward fetch is issued.
    pub fn select_district(&mut self, district: Option<DistrictId>) -> Option<Ticket<DistrictId>> {
        let district = district.filter(|id| !id.is_blank());
        if let Some(id) = &district
            && !self.districts.iter().any(|d| d.id == *id)
        {
            return None;
        }

        self.district.clone_from(&district);
        self.ward = None;
        self.wards.clear();
        self.ward_gen = self.ward_gen.wrapping_add(1);

        district.map(|scope| Ticket {
            scope,
            generation: self.ward_gen,
        })
    }

    /// Select or clear the ward.
    ///
    /// Returns `false` and leaves the selection alone when the ward is not in
    /// the loaded list for the selected district.
    pub fn select_ward(&mut self, ward: Option<WardId>) -> bool {
        let ward = ward.filter(|id| !id.is_blank());
        if let Some(id) = &ward
            && !self.wards.iter().any(|w| w.id == *id)
        {
            return false;
        }
        self.ward = ward;
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fetch results
    // ─────────────────────────────────────────────────────────────────────

    /// Store the province list if the ticket is still current.
    pub fn apply_provinces<E>(
        &mut self,
        ticket: &Ticket<()>,
        result: Result<Vec<Province>, E>,
    ) -> Applied {
        if ticket.generation != self.province_gen {
            return Applied::Stale;
        }
        match result {
            Ok(list) => {
                self.provinces = list;
                Applied::Loaded(self.provinces.len())
            }
            Err(_) => {
                self.provinces.clear();
                Applied::Failed
            }
        }
    }

    /// Store the district list if the ticket is still current.
    ///
    /// Entries that declare a different parent province are dropped.
    pub fn apply_districts<E>(
        &mut self,
        ticket: &Ticket<ProvinceId>,
        result: Result<Vec<District>, E>,
    ) -> Applied {
        if ticket.generation != self.district_gen {
            return Applied::Stale;
        }
        match result {
            Ok(list) => {
                self.districts = list
                    .into_iter()
                    .filter(|d| d.province_id.as_ref().is_none_or(|p| *p == ticket.scope))
                    .collect();
                Applied::Loaded(self.districts.len())
            }
            Err(_) => {
                self.districts.clear();
                Applied::Failed
            }
        }
    }

    /// Store the ward list if the ticket is still current.
    ///
    /// Entries that declare a different parent district are dropped.
    pub fn apply_wards<E>(&mut self, ticket: &Ticket<DistrictId>, result: Result<Vec<Ward>, E>) -> Applied {
        if ticket.generation != self.ward_gen {
            return Applied::Stale;
        }
        match result {
            Ok(list) => {
                self.wards = list
                    .into_iter()
                    .filter(|w| w.district_id.as_ref().is_none_or(|d| *d == ticket.scope))
                    .collect();
                Applied::Loaded(self.wards.len())
            }
            Err(_) => {
                self.wards.clear();
                Applied::Failed
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    #[must_use]
    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    #[must_use]
    pub fn wards(&self) -> &[Ward] {
        &self.wards
    }

    #[must_use]
    pub const fn selected_province(&self) -> Option<&ProvinceId> {
        self.province.as_ref()
    }

    #[must_use]
    pub const fn selected_district(&self) -> Option<&DistrictId> {
        self.district.as_ref()
    }

    #[must_use]
    pub const fn selected_ward(&self) -> Option<&WardId> {
        self.ward.as_ref()
    }

    /// Whether all three levels have a selection.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.province.is_some() && self.district.is_some() && self.ward.is_some()
    }

    /// Resolve the selected ids to names against the currently loaded lists.
    #[must_use]
    pub fn resolve(&self) -> ResolvedAddress {
        fn lookup<'a, I, T: 'a>(
            selected: Option<&impl AsRef<str>>,
            list: I,
            key: impl Fn(&T) -> (&str, &str),
        ) -> (String, String)
        where
            I: IntoIterator<Item = &'a T>,
        {
            let Some(id) = selected.map(AsRef::as_ref) else {
                return (String::new(), String::new());
            };
            let name = list
                .into_iter()
                .map(&key)
                .find(|(candidate, _)| *candidate == id)
                .map(|(_, name)| name.to_owned())
                .unwrap_or_default();
            (id.to_owned(), name)
        }

        let (province, province_name) = lookup(self.province.as_ref(), &self.provinces, |p: &Province| {
            (p.id.as_str(), p.name.as_str())
        });
        let (district, district_name) = lookup(self.district.as_ref(), &self.districts, |d: &District| {
            (d.id.as_str(), d.name.as_str())
        });
        let (ward, ward_name) = lookup(self.ward.as_ref(), &self.wards, |w: &Ward| {
            (w.id.as_str(), w.name.as_str())
        });

        ResolvedAddress {
            province,
            province_name,
            district,
            district_name,
            ward,
            ward_name,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Unavailable;

    fn province(id: &str, name: &str) -> Province {
        Province {
            id: ProvinceId::new(id),
            name: name.to_string(),
        }
    }

    fn district(id: &str, name: &str, province: &str) -> District {
        District {
            id: DistrictId::new(id),
            name: name.to_string(),
            province_id: Some(ProvinceId::new(province)),
        }
    }

    fn ward(id: &str, name: &str, district: &str) -> Ward {
        Ward {
            id: WardId::new(id),
            name: name.to_string(),
            district_id: Some(DistrictId::new(district)),
        }
    }

    fn loaded_cascade() -> AddressCascade {
        let mut cascade = AddressCascade::new();
        let t = cascade.begin_provinces();
        cascade.apply_provinces::<Unavailable>(
            &t,
            Ok(vec![province("1", "Hanoi"), province("79", "Ho Chi Minh")]),
        );
        let t = cascade.select_province(Some(ProvinceId::new("1"))).unwrap();
        cascade.apply_districts::<Unavailable>(&t, Ok(vec![district("10", "Dong Da", "1")]));
        let t = cascade.select_district(Some(DistrictId::new("10"))).unwrap();
        cascade.apply_wards::<Unavailable>(&t, Ok(vec![ward("100", "Lang", "10")]));
        cascade.select_ward(Some(WardId::new("100")));
        cascade
    }

    #[test]
    fn test_full_selection_resolves_names() {
        let mut cascade = AddressCascade::new();

        let t = cascade.begin_provinces();
        assert_eq!(
            cascade.apply_provinces::<Unavailable>(&t, Ok(vec![province("1", "Hanoi")])),
            Applied::Loaded(1)
        );

        let t = cascade.select_province(Some(ProvinceId::new("1"))).unwrap();
        assert_eq!(t.scope().as_str(), "1");
        cascade.apply_districts::<Unavailable>(&t, Ok(vec![district("10", "Dong Da", "1")]));

        let t = cascade.select_district(Some(DistrictId::new("10"))).unwrap();
        assert_eq!(t.scope().as_str(), "10");
        cascade.apply_wards::<Unavailable>(&t, Ok(vec![ward("100", "Lang", "10")]));

        cascade.select_ward(Some(WardId::new("100")));
        assert!(cascade.is_complete());

        assert_eq!(
            cascade.resolve(),
            ResolvedAddress {
                province: "1".to_string(),
                province_name: "Hanoi".to_string(),
                district: "10".to_string(),
                district_name: "Dong Da".to_string(),
                ward: "100".to_string(),
                ward_name: "Lang".to_string(),
            }
        );
    }

    #[test]
    fn test_changing_province_resets_everything_below() {
        let mut cascade = loaded_cascade();

        let ticket = cascade.select_province(Some(ProvinceId::new("79")));

        assert!(ticket.is_some());
        assert_eq!(cascade.selected_province().map(ProvinceId::as_str), Some("79"));
        assert_eq!(cascade.selected_district(), None);
        assert_eq!(cascade.selected_ward(), None);
        assert!(cascade.districts().is_empty());
        assert!(cascade.wards().is_empty());
        assert_eq!(cascade.provinces().len(), 2);
    }

    #[test]
    fn test_reselecting_same_province_still_resets() {
        let mut cascade = loaded_cascade();

        cascade.select_province(Some(ProvinceId::new("1")));

        assert_eq!(cascade.selected_district(), None);
        assert_eq!(cascade.selected_ward(), None);
        assert!(cascade.districts().is_empty());
    }

    #[test]
    fn test_clearing_province_resets_and_fetches_nothing() {
        let mut cascade = loaded_cascade();

        assert!(cascade.select_province(None).is_none());
        assert!(cascade.select_province(Some(ProvinceId::new(""))).is_none());

        assert_eq!(cascade.selected_province(), None);
        assert_eq!(cascade.selected_district(), None);
        assert_eq!(cascade.selected_ward(), None);
        assert!(cascade.districts().is_empty());
        assert!(cascade.wards().is_empty());
    }

    #[test]
    fn test_clearing_district_fetches_nothing() {
        let mut cascade = loaded_cascade();

        assert!(cascade.select_district(None).is_none());
        assert_eq!(cascade.selected_province().map(ProvinceId::as_str), Some("1"));
        assert_eq!(cascade.selected_ward(), None);
        assert!(cascade.wards().is_empty());
        assert_eq!(cascade.districts().len(), 1);
    }

    #[test]
    fn test_late_district_response_is_discarded() {
        let mut cascade = AddressCascade::new();

        let for_a = cascade.select_province(Some(ProvinceId::new("A"))).unwrap();
        let for_c = cascade.select_province(Some(ProvinceId::new("C"))).unwrap();

        // C answers first, then the superseded A response arrives.
        assert_eq!(
            cascade.apply_districts::<Unavailable>(&for_c, Ok(vec![district("c1", "C one", "C")])),
            Applied::Loaded(1)
        );
        assert_eq!(
            cascade.apply_districts::<Unavailable>(&for_a, Ok(vec![district("a1", "A one", "A")])),
            Applied::Stale
        );

        assert_eq!(cascade.districts().len(), 1);
        assert_eq!(cascade.districts()[0].id.as_str(), "c1");
    }

    #[test]
    fn test_late_response_after_clear_is_discarded() {
        let mut cascade = AddressCascade::new();

        let pending = cascade.select_province(Some(ProvinceId::new("1"))).unwrap();
        cascade.select_province(None);

        assert_eq!(
            cascade.apply_districts::<Unavailable>(&pending, Ok(vec![district("10", "Dong Da", "1")])),
            Applied::Stale
        );
        assert!(cascade.districts().is_empty());
    }

    #[test]
    fn test_late_ward_response_discarded_after_province_change() {
        let mut cascade = loaded_cascade();

        let pending = cascade.select_district(Some(DistrictId::new("10"))).unwrap();
        cascade.select_province(Some(ProvinceId::new("79")));

        assert_eq!(
            cascade.apply_wards::<Unavailable>(&pending, Ok(vec![ward("100", "Lang", "10")])),
            Applied::Stale
        );
        assert!(cascade.wards().is_empty());
    }

    #[test]
    fn test_failed_fetch_empties_only_its_level() {
        let mut cascade = loaded_cascade();

        let t = cascade.select_district(Some(DistrictId::new("10"))).unwrap();
        assert_eq!(cascade.apply_wards(&t, Err(Unavailable)), Applied::Failed);

        assert!(cascade.wards().is_empty());
        assert_eq!(cascade.selected_province().map(ProvinceId::as_str), Some("1"));
        assert_eq!(cascade.selected_district().map(DistrictId::as_str), Some("10"));
        assert_eq!(cascade.districts().len(), 1);
    }

    #[test]
    fn test_children_of_other_parents_are_dropped() {
        let mut cascade = AddressCascade::new();

        let t = cascade.select_province(Some(ProvinceId::new("1"))).unwrap();
        let applied = cascade.apply_districts::<Unavailable>(
            &t,
            Ok(vec![
                district("10", "Dong Da", "1"),
                district("760", "Quan 1", "79"),
                District {
                    id: DistrictId::new("11"),
                    name: "Ba Dinh".to_string(),
                    province_id: None,
                },
            ]),
        );

        assert_eq!(applied, Applied::Loaded(2));
        assert!(cascade.districts().iter().all(|d| d.id.as_str() != "760"));
    }

    #[test]
    fn test_resolution_miss_gives_empty_name() {
        let mut cascade = AddressCascade::new();
        let t = cascade.begin_provinces();
        cascade.apply_provinces::<Unavailable>(&t, Ok(vec![province("1", "Hanoi")]));

        cascade.select_province(Some(ProvinceId::new("99")));

        let resolved = cascade.resolve();
        assert_eq!(resolved.province, "99");
        assert_eq!(resolved.province_name, "");
        assert_eq!(resolved.district, "");
        assert_eq!(resolved.ward, "");
        assert_eq!(resolved.ward_name, "");
    }

    #[test]
    fn test_district_of_another_province_is_ignored() {
        let mut cascade = AddressCascade::new();
        let t = cascade.select_province(Some(ProvinceId::new("1"))).unwrap();
        cascade.apply_districts::<Unavailable>(&t, Ok(vec![district("10", "Dong Da", "1")]));

        // "760" belongs to Ho Chi Minh; a request made before the switch to Hanoi.
        assert!(cascade.select_district(Some(DistrictId::new("760"))).is_none());
        assert_eq!(cascade.selected_district(), None);

        // Nothing loaded yet: every district is unknown.
        cascade.select_province(Some(ProvinceId::new("79")));
        assert!(cascade.select_district(Some(DistrictId::new("760"))).is_none());
        assert_eq!(cascade.selected_district(), None);
        assert!(!cascade.is_complete());
    }

    #[test]
    fn test_unknown_district_keeps_current_selection() {
        let mut cascade = loaded_cascade();

        assert!(cascade.select_district(Some(DistrictId::new("760"))).is_none());

        assert_eq!(cascade.selected_district().map(DistrictId::as_str), Some("10"));
        assert_eq!(cascade.selected_ward().map(WardId::as_str), Some("100"));
        assert_eq!(cascade.wards().len(), 1);
        assert!(cascade.is_complete());
    }

    #[test]
    fn test_ward_outside_loaded_list_is_ignored() {
        let mut cascade = loaded_cascade();

        assert!(!cascade.select_ward(Some(WardId::new("26734"))));
        assert_eq!(cascade.selected_ward().map(WardId::as_str), Some("100"));

        assert!(cascade.select_ward(None));
        assert!(!cascade.select_ward(Some(WardId::new("26734"))));
        assert_eq!(cascade.selected_ward(), None);
        assert!(!cascade.is_complete());
    }

    #[test]
    fn test_ward_needs_a_loaded_list() {
        let mut cascade = loaded_cascade();

        let t = cascade.select_district(Some(DistrictId::new("10"))).unwrap();
        cascade.apply_wards(&t, Err(Unavailable));

        assert!(!cascade.select_ward(Some(WardId::new("100"))));
        assert!(!cascade.is_complete());
        assert_eq!(cascade.resolve().ward, "");
    }

    #[test]
    fn test_stale_province_list_reload() {
        let mut cascade = AddressCascade::new();
        let first = cascade.begin_provinces();
        let second = cascade.begin_provinces();

        assert_eq!(
            cascade.apply_provinces::<Unavailable>(&first, Ok(vec![province("1", "Hanoi")])),
            Applied::Stale
        );
        assert_eq!(
            cascade.apply_provinces::<Unavailable>(&second, Ok(vec![])),
            Applied::Loaded(0)
        );
    }

    #[test]
    fn test_resolved_address_serializes_camel_case() {
        let json = serde_json::to_value(loaded_cascade().resolve()).unwrap();
        assert_eq!(json["provinceName"], "Hanoi");
        assert_eq!(json["districtName"], "Dong Da");
        assert_eq!(json["wardName"], "Lang");
        assert_eq!(json["ward"], "100");
    }
}
