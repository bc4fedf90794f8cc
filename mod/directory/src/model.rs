use serde::{Deserialize, Serialize};

/// A registered student.
///
/// The `id` is the school-issued identifier (it is what a badge scan
/// yields), so it is caller-supplied rather than generated. No credentials
/// are stored here — authentication lives outside this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_level: Option<String>,
    pub created_at: String,
}

/// Body for `POST /students`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudentRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub grade_level: Option<String>,
}

/// Query parameters for `GET /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_json_roundtrip() {
        let s = Student {
            id: "2021-00123".into(),
            name: "Maria Cruz".into(),
            email: "maria@school.edu".into(),
            grade_level: Some("3rd Year".into()),
            created_at: "2026-01-01T00:00:00+00:00".into(),
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: Student = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
        assert!(json.contains("gradeLevel"));
    }

    #[test]
    fn grade_level_is_optional() {
        let json = r#"{"id":"s1","name":"Ana","email":"ana@school.edu"}"#;
        let req: RegisterStudentRequest = serde_json::from_str(json).unwrap();
        assert!(req.grade_level.is_none());
    }
}
