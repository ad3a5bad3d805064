//! Athlete, participation and class records consumed by the composers.
//!
//! Records arrive from the registration API in two shapes: an athlete with a
//! sparse copy of its participations, and a separately fetched participant
//! list whose entries carry the full nested class relations. The reconcile
//! functions below merge the two with "richer relations win" precedence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Discipline {
    Kyorugi,
    Poomsae,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Kyorugi => "KYORUGI",
            Discipline::Poomsae => "POOMSAE",
        }
    }
}

/// Competition tier. Selects the ID card template variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionTier {
    Pemula,
    Prestasi,
}

impl CompetitionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionTier::Pemula => "pemula",
            CompetitionTier::Prestasi => "prestasi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParticipationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    LakiLaki,
    Perempuan,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Gender::LakiLaki => "Male",
            Gender::Perempuan => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MedalStatus {
    Gold,
    Silver,
    Bronze,
    Participant,
}

impl MedalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MedalStatus::Gold => "First Winner",
            MedalStatus::Silver => "Second Winner",
            MedalStatus::Bronze => "Third Winner",
            MedalStatus::Participant => "Participant",
        }
    }
}

/// A competition class. Every relation is optional because sparse copies
/// only carry a subset of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub discipline: Option<Discipline>,
    #[serde(default)]
    pub tier: Option<CompetitionTier>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub weight_class: Option<String>,
    #[serde(default)]
    pub poomsae_form: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl ClassDefinition {
    /// Number of populated relations.
    pub fn richness(&self) -> usize {
        [
            self.discipline.is_some(),
            self.tier.is_some(),
            non_blank(&self.age_group),
            non_blank(&self.weight_class),
            non_blank(&self.poomsae_form),
            self.gender.is_some(),
        ]
        .into_iter()
        .filter(|v| *v)
        .count()
    }

    /// Weight class for sparring, form for poomsae, otherwise whichever is set.
    pub fn division(&self) -> Option<&str> {
        let weight = self.weight_class.as_deref().filter(|v| !v.trim().is_empty());
        let form = self.poomsae_form.as_deref().filter(|v| !v.trim().is_empty());
        match self.discipline {
            Some(Discipline::Poomsae) => form.or(weight),
            _ => weight.or(form),
        }
    }

    /// Age group, unless it merely repeats the beginner tier.
    pub fn display_age_group(&self) -> Option<&str> {
        self.age_group
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("pemula"))
    }

    /// Field-wise merge. The richer definition takes precedence and the other
    /// one only fills relations the richer one lacks.
    pub fn merged_with(&self, other: &ClassDefinition) -> ClassDefinition {
        let (primary, secondary) = if other.richness() > self.richness() {
            (other, self)
        } else {
            (self, other)
        };
        ClassDefinition {
            id: primary.id.or(secondary.id),
            discipline: primary.discipline.or(secondary.discipline),
            tier: primary.tier.or(secondary.tier),
            age_group: pick_text(&primary.age_group, &secondary.age_group),
            weight_class: pick_text(&primary.weight_class, &secondary.weight_class),
            poomsae_form: pick_text(&primary.poomsae_form, &secondary.poomsae_form),
            gender: primary.gender.or(secondary.gender),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub weight_class: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub participations: Vec<ParticipationRecord>,
}

impl AthleteRecord {
    /// The APPROVED participation, or the first one when none is approved.
    pub fn authoritative_participation(&self) -> Option<&ParticipationRecord> {
        self.participations
            .iter()
            .find(|p| p.status == ParticipationStatus::Approved)
            .or_else(|| self.participations.first())
    }

    pub fn club_name(&self) -> Option<&str> {
        self.club.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub id: i64,
    #[serde(default)]
    pub status: ParticipationStatus,
    #[serde(default)]
    pub class: Option<ClassDefinition>,
    #[serde(default)]
    pub athlete: Option<Box<AthleteRecord>>,
    #[serde(default)]
    pub is_team: bool,
    #[serde(default)]
    pub members: Vec<AthleteRecord>,
}

impl ParticipationRecord {
    fn class_richness(&self) -> usize {
        self.class.as_ref().map(ClassDefinition::richness).unwrap_or(0)
    }

    fn athlete_id(&self) -> Option<i64> {
        self.athlete.as_ref().map(|a| a.id)
    }

    /// Copy of this record without its nested athlete, as stored on an athlete.
    pub fn detached(&self) -> ParticipationRecord {
        ParticipationRecord {
            athlete: None,
            ..self.clone()
        }
    }
}

/// Merges `sparse` with its counterpart in `full_list` (same participation id).
pub fn reconcile_participation(
    sparse: &ParticipationRecord,
    full_list: &[ParticipationRecord],
) -> ParticipationRecord {
    let Some(rich) = full_list.iter().find(|p| p.id == sparse.id) else {
        return sparse.clone();
    };
    merge_participations(sparse, rich)
}

/// Resolves the participation that drives an athlete's class label.
///
/// The athlete's authoritative participation is reconciled against the full
/// list. When the athlete carries no participation at all, the list entry for
/// the same athlete (approved first) is used instead.
pub fn resolve_participation(
    athlete: &AthleteRecord,
    full_list: Option<&[ParticipationRecord]>,
) -> Option<ParticipationRecord> {
    let list = full_list.unwrap_or(&[]);
    if let Some(own) = athlete.authoritative_participation() {
        return Some(reconcile_participation(own, list));
    }
    let mut candidates = list.iter().filter(|p| p.athlete_id() == Some(athlete.id));
    let first = candidates.next()?;
    let approved = std::iter::once(first)
        .chain(candidates)
        .find(|p| p.status == ParticipationStatus::Approved);
    Some(approved.unwrap_or(first).clone())
}

fn merge_participations(
    sparse: &ParticipationRecord,
    rich: &ParticipationRecord,
) -> ParticipationRecord {
    let class = match (&sparse.class, &rich.class) {
        (Some(a), Some(b)) => Some(a.merged_with(b)),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), None) => Some(a.clone()),
        (None, None) => None,
    };
    let (primary, secondary) = if rich.class_richness() >= sparse.class_richness() {
        (rich, sparse)
    } else {
        (sparse, rich)
    };
    ParticipationRecord {
        id: sparse.id,
        status: primary.status,
        class,
        athlete: primary.athlete.clone().or_else(|| secondary.athlete.clone()),
        is_team: primary.is_team || secondary.is_team,
        members: if primary.members.is_empty() {
            secondary.members.clone()
        } else {
            primary.members.clone()
        },
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn pick_text(primary: &Option<String>, secondary: &Option<String>) -> Option<String> {
    if non_blank(primary) {
        primary.clone()
    } else if non_blank(secondary) {
        secondary.clone()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse_class() -> ClassDefinition {
        ClassDefinition {
            id: Some(7),
            discipline: Some(Discipline::Kyorugi),
            ..ClassDefinition::default()
        }
    }

    fn rich_class() -> ClassDefinition {
        ClassDefinition {
            id: Some(7),
            discipline: Some(Discipline::Kyorugi),
            tier: Some(CompetitionTier::Prestasi),
            age_group: Some("Cadet".to_string()),
            weight_class: Some("Under 45 kg".to_string()),
            poomsae_form: None,
            gender: Some(Gender::Perempuan),
        }
    }

    fn participation(id: i64, status: ParticipationStatus, class: ClassDefinition) -> ParticipationRecord {
        ParticipationRecord {
            id,
            status,
            class: Some(class),
            ..ParticipationRecord::default()
        }
    }

    #[test]
    fn approved_participation_is_authoritative() {
        let athlete = AthleteRecord {
            id: 1,
            name: "Sari".to_string(),
            participations: vec![
                participation(10, ParticipationStatus::Pending, sparse_class()),
                participation(11, ParticipationStatus::Approved, sparse_class()),
            ],
            ..AthleteRecord::default()
        };
        assert_eq!(athlete.authoritative_participation().map(|p| p.id), Some(11));
    }

    #[test]
    fn first_participation_is_used_without_approval() {
        let athlete = AthleteRecord {
            id: 1,
            name: "Sari".to_string(),
            participations: vec![
                participation(10, ParticipationStatus::Pending, sparse_class()),
                participation(11, ParticipationStatus::Rejected, sparse_class()),
            ],
            ..AthleteRecord::default()
        };
        assert_eq!(athlete.authoritative_participation().map(|p| p.id), Some(10));
    }

    #[test]
    fn richer_class_wins_reconciliation() {
        let sparse = participation(10, ParticipationStatus::Approved, sparse_class());
        let list = vec![participation(10, ParticipationStatus::Approved, rich_class())];
        let merged = reconcile_participation(&sparse, &list);
        assert_eq!(merged.class, Some(rich_class()));
    }

    #[test]
    fn sparse_fields_fill_gaps_of_richer_class() {
        let mut rich = rich_class();
        rich.id = None;
        let merged = sparse_class().merged_with(&rich);
        assert_eq!(merged.id, Some(7));
        assert_eq!(merged.tier, Some(CompetitionTier::Prestasi));
    }

    #[test]
    fn unmatched_participation_is_returned_unchanged() {
        let sparse = participation(10, ParticipationStatus::Approved, sparse_class());
        let list = vec![participation(99, ParticipationStatus::Approved, rich_class())];
        assert_eq!(reconcile_participation(&sparse, &list), sparse);
    }

    #[test]
    fn list_entry_for_same_athlete_is_used_when_athlete_has_none() {
        let athlete = AthleteRecord {
            id: 5,
            name: "Budi".to_string(),
            ..AthleteRecord::default()
        };
        let mut pending = participation(20, ParticipationStatus::Pending, sparse_class());
        pending.athlete = Some(Box::new(athlete.clone()));
        let mut approved = participation(21, ParticipationStatus::Approved, rich_class());
        approved.athlete = Some(Box::new(athlete.clone()));
        let list = vec![pending, approved];
        let resolved = resolve_participation(&athlete, Some(&list)).expect("resolved");
        assert_eq!(resolved.id, 21);
    }

    #[test]
    fn division_prefers_form_for_poomsae() {
        let class = ClassDefinition {
            discipline: Some(Discipline::Poomsae),
            weight_class: Some("Under 30 kg".to_string()),
            poomsae_form: Some("Recognized".to_string()),
            ..ClassDefinition::default()
        };
        assert_eq!(class.division(), Some("Recognized"));
    }

    #[test]
    fn records_deserialize_from_api_json() {
        let raw = r#"{
            "id": 3,
            "name": "Rina",
            "club": "Dojang Merdeka",
            "gender": "PEREMPUAN",
            "participations": [{
                "id": 8,
                "status": "APPROVED",
                "class": {"discipline": "POOMSAE", "tier": "pemula", "age_group": "Pemula"}
            }]
        }"#;
        let athlete: AthleteRecord = serde_json::from_str(raw).expect("parse");
        assert_eq!(athlete.gender, Some(Gender::Perempuan));
        let class = athlete.participations[0].class.as_ref().expect("class");
        assert_eq!(class.tier, Some(CompetitionTier::Pemula));
        assert_eq!(class.display_age_group(), None);
    }
}
