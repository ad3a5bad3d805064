use crate::model::{AthleteRecord, ClassDefinition, ParticipationRecord, resolve_participation};

pub const CATEGORY_UNAVAILABLE: &str = "Category Unavailable";

/// ID card class label: `tier - discipline - age group - weight class or form`.
///
/// Missing relations drop their segment; an age group equal to "pemula" is
/// omitted because the tier already says so.
pub fn id_card_class_label(class: &ClassDefinition) -> Option<String> {
    let segments: Vec<&str> = [
        class.tier.map(|t| t.as_str()),
        class.discipline.map(|d| d.as_str()),
        class.display_age_group(),
        class.division(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" - "))
    }
}

/// Resolves the label printed on an athlete's ID card.
pub fn athlete_class_label(
    athlete: &AthleteRecord,
    full_list: Option<&[ParticipationRecord]>,
) -> String {
    let from_class = resolve_participation(athlete, full_list)
        .and_then(|p| p.class)
        .and_then(|class| id_card_class_label(&class));
    if let Some(label) = from_class {
        return label;
    }
    athlete
        .weight_class
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| CATEGORY_UNAVAILABLE.to_string())
}

/// Certificate class label: `discipline [age group] [weight class or form] [gender]`.
pub fn kelas_kejuaraan(class: &ClassDefinition) -> String {
    [
        class.discipline.map(|d| d.as_str()),
        class.display_age_group(),
        class.division(),
        class.gender.map(|g| g.label()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompetitionTier, Discipline, Gender, ParticipationStatus};

    fn kyorugi(tier: CompetitionTier, age_group: &str) -> ClassDefinition {
        ClassDefinition {
            discipline: Some(Discipline::Kyorugi),
            tier: Some(tier),
            age_group: Some(age_group.to_string()),
            weight_class: Some("Under 30 kg".to_string()),
            ..ClassDefinition::default()
        }
    }

    #[test]
    fn id_label_lists_all_segments() {
        let class = kyorugi(CompetitionTier::Prestasi, "Pracadet");
        assert_eq!(
            id_card_class_label(&class).as_deref(),
            Some("prestasi - KYORUGI - Pracadet - Under 30 kg")
        );
    }

    #[test]
    fn id_label_omits_pemula_age_group() {
        let class = kyorugi(CompetitionTier::Pemula, "PEMULA");
        assert_eq!(
            id_card_class_label(&class).as_deref(),
            Some("pemula - KYORUGI - Under 30 kg")
        );
    }

    #[test]
    fn certificate_label_joins_with_spaces() {
        let class = ClassDefinition {
            discipline: Some(Discipline::Poomsae),
            age_group: Some("Junior".to_string()),
            poomsae_form: Some("Recognized".to_string()),
            gender: Some(Gender::LakiLaki),
            ..ClassDefinition::default()
        };
        assert_eq!(kelas_kejuaraan(&class), "POOMSAE Junior Recognized Male");
    }

    #[test]
    fn certificate_label_skips_pemula() {
        let class = ClassDefinition {
            discipline: Some(Discipline::Kyorugi),
            age_group: Some("pemula".to_string()),
            weight_class: Some("Under 45 kg".to_string()),
            gender: Some(Gender::Perempuan),
            ..ClassDefinition::default()
        };
        assert_eq!(kelas_kejuaraan(&class), "KYORUGI Under 45 kg Female");
    }

    #[test]
    fn athlete_label_falls_back_to_weight_class_then_placeholder() {
        let mut athlete = AthleteRecord {
            id: 1,
            name: "Dewi".to_string(),
            weight_class: Some("Under 50 kg".to_string()),
            ..AthleteRecord::default()
        };
        assert_eq!(athlete_class_label(&athlete, None), "Under 50 kg");
        athlete.weight_class = None;
        assert_eq!(athlete_class_label(&athlete, None), CATEGORY_UNAVAILABLE);
    }

    #[test]
    fn athlete_label_uses_reconciled_class() {
        let athlete = AthleteRecord {
            id: 1,
            name: "Dewi".to_string(),
            participations: vec![ParticipationRecord {
                id: 4,
                status: ParticipationStatus::Approved,
                class: Some(ClassDefinition {
                    discipline: Some(Discipline::Kyorugi),
                    ..ClassDefinition::default()
                }),
                ..ParticipationRecord::default()
            }],
            ..AthleteRecord::default()
        };
        let list = vec![ParticipationRecord {
            id: 4,
            status: ParticipationStatus::Approved,
            class: Some(kyorugi(CompetitionTier::Prestasi, "Pracadet")),
            ..ParticipationRecord::default()
        }];
        assert_eq!(
            athlete_class_label(&athlete, Some(&list)),
            "prestasi - KYORUGI - Pracadet - Under 30 kg"
        );
    }
}
