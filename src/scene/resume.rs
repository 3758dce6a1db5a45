use serde::{Deserialize, Serialize};

const RESUME_JSON: &str = include_str!("../../assets/resume.json");

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PersonalInfo {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub portfolio: String,
}

impl PersonalInfo {
    /// 名字的第一个词，用于 "About ..." 标题
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// 非空的联系方式，按固定顺序
    pub fn contact_lines(&self) -> Vec<(&'static str, &str)> {
        [
            ("Location", self.location.as_str()),
            ("Email", self.email.as_str()),
            ("Phone", self.phone.as_str()),
            ("LinkedIn", self.linkedin.as_str()),
            ("GitHub", self.github.as_str()),
            ("Portfolio", self.portfolio.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect()
    }

    /// 页头展示的外部链接（LinkedIn、GitHub、个人网站），跳过空值
    pub fn header_links(&self) -> Vec<(&'static str, &str)> {
        self.contact_lines()
            .into_iter()
            .filter(|(label, _)| matches!(*label, "LinkedIn" | "GitHub" | "Portfolio"))
            .collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExperienceEntry {
    pub company: String,
    pub title: String,
    pub dates: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(default)]
    pub tech: Option<String>,
}

impl ProjectEntry {
    /// 空字符串和缺失字段都视为没有技术标签
    pub fn tech_label(&self) -> Option<&str> {
        self.tech.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EducationEntry {
    pub degree: String,
    pub school: String,
    pub dates: String,
    #[serde(default)]
    pub details: Vec<String>,
}

/// The static résumé document. Loaded once at startup, read-only afterwards.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResumeData {
    pub personal: PersonalInfo,
    pub profile: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default)]
    pub leadership: Vec<String>,
    #[serde(default)]
    pub open_source: Vec<String>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
}

impl ResumeData {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 编译期内嵌的 assets/resume.json
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_json_str(RESUME_JSON)
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.tech_stack.iter().any(|s| s == skill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_resume_parses() {
        let resume = ResumeData::embedded().unwrap();
        assert!(!resume.personal.name.is_empty());
        assert!(!resume.experience.is_empty());
        assert!(resume.has_skill("React"));
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let json = r#"{
            "personal": { "name": "Sam Lee", "role": "Engineer" },
            "profile": "Hello."
        }"#;
        let resume = ResumeData::from_json_str(json).unwrap();
        assert!(resume.tech_stack.is_empty());
        assert!(resume.projects.is_empty());
        assert!(resume.education.is_empty());
        assert_eq!(resume.personal.first_name(), "Sam");
        assert!(resume.personal.contact_lines().is_empty());
    }

    #[test]
    fn empty_project_tech_is_no_label() {
        let json = r#"{ "name": "X", "desc": "d", "tech": "  " }"#;
        let project: ProjectEntry = serde_json::from_str(json).unwrap();
        assert_eq!(project.tech_label(), None);

        let json = r#"{ "name": "X", "desc": "d" }"#;
        let project: ProjectEntry = serde_json::from_str(json).unwrap();
        assert_eq!(project.tech_label(), None);

        let json = r#"{ "name": "X", "desc": "d", "tech": "Rust" }"#;
        let project: ProjectEntry = serde_json::from_str(json).unwrap();
        assert_eq!(project.tech_label(), Some("Rust"));
    }

    #[test]
    fn header_links_skip_other_contacts() {
        let json = r#"{
            "personal": { "name": "Sam Lee", "role": "Engineer", "email": "s@l.dev",
                          "github": "https://github.com/sam", "portfolio": " " },
            "profile": "Hello."
        }"#;
        let resume = ResumeData::from_json_str(json).unwrap();
        assert_eq!(resume.personal.header_links(), vec![("GitHub", "https://github.com/sam")]);
    }

    #[test]
    fn missing_profile_is_rejected() {
        let json = r#"{ "personal": { "name": "A", "role": "B" } }"#;
        assert!(ResumeData::from_json_str(json).is_err());
    }
}
