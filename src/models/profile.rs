// src/models/profile.rs

use serde::{Deserialize, Serialize};

/// Placeholder printed on the quiz header when the profile is unknown.
pub const NAME_PLACEHOLDER: &str = "........................";

/// Student data from the external profile system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile {
    pub student_id: String,
    pub full_name: String,
    pub grade_level: Option<i64>,
    pub current_class: Option<String>,
    pub difficulty_preference: String,
}

/// Header fields for a generated quiz. Never blocks the lifecycle: an
/// unknown student gets placeholder values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentInfo {
    pub full_name: String,
    pub current_class: String,
    pub grade_level: Option<i64>,
    /// Vietnamese difficulty label (`dễ`, `trung bình`, `khó`).
    pub difficulty: String,
}

impl StudentInfo {
    pub fn from_profile(profile: Option<&StudentProfile>) -> Self {
        match profile {
            Some(p) => Self {
                full_name: p.full_name.clone(),
                current_class: p
                    .current_class
                    .clone()
                    .unwrap_or_else(|| NAME_PLACEHOLDER.to_string()),
                grade_level: p.grade_level,
                difficulty: difficulty_label(&p.difficulty_preference).to_string(),
            },
            None => Self {
                full_name: NAME_PLACEHOLDER.to_string(),
                current_class: NAME_PLACEHOLDER.to_string(),
                grade_level: None,
                difficulty: difficulty_label("medium").to_string(),
            },
        }
    }
}

/// Maps `easy|medium|hard` (or an already Vietnamese label) to the Vietnamese
/// difficulty label. Anything else is `trung bình`.
pub fn difficulty_label(value: &str) -> &'static str {
    match value.trim().to_lowercase().as_str() {
        "easy" | "dễ" | "de" => "dễ",
        "hard" | "khó" | "kho" => "khó",
        _ => "trung bình",
    }
}

/// On-disk shape of the profile API response (`data/api/student.json`).
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<ProfileData>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileData {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<ProfileUser>,
    #[serde(default)]
    pub grade_level: Option<i64>,
    #[serde(default)]
    pub current_class: Option<String>,
    #[serde(default)]
    pub difficulty_preference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUser {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl From<ProfileData> for StudentProfile {
    fn from(data: ProfileData) -> Self {
        Self {
            student_id: data.id,
            full_name: data
                .user_id
                .and_then(|u| u.full_name)
                .unwrap_or_else(|| NAME_PLACEHOLDER.to_string()),
            grade_level: data.grade_level,
            current_class: data.current_class,
            difficulty_preference: data
                .difficulty_preference
                .unwrap_or_else(|| "medium".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_label_mapping() {
        assert_eq!(difficulty_label("easy"), "dễ");
        assert_eq!(difficulty_label("Medium"), "trung bình");
        assert_eq!(difficulty_label("HARD"), "khó");
        assert_eq!(difficulty_label("khó"), "khó");
        assert_eq!(difficulty_label("whatever"), "trung bình");
    }

    #[test]
    fn test_missing_profile_uses_placeholders() {
        let info = StudentInfo::from_profile(None);
        assert_eq!(info.full_name, NAME_PLACEHOLDER);
        assert_eq!(info.current_class, NAME_PLACEHOLDER);
        assert_eq!(info.difficulty, "trung bình");
    }

    #[test]
    fn test_profile_response_parses() {
        let raw = r#"{
            "success": true,
            "data": {
                "_id": "s1",
                "user_id": {"full_name": "Trần Thị B"},
                "grade_level": 11,
                "current_class": "11A2",
                "difficulty_preference": "hard"
            }
        }"#;
        let response: ProfileResponse = serde_json::from_str(raw).unwrap();
        let profile = StudentProfile::from(response.data.unwrap());
        assert_eq!(profile.student_id, "s1");
        assert_eq!(profile.full_name, "Trần Thị B");

        let info = StudentInfo::from_profile(Some(&profile));
        assert_eq!(info.current_class, "11A2");
        assert_eq!(info.difficulty, "khó");
    }
}
