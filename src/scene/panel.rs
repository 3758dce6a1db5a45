use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::resume::ResumeData;

/// 面板主题。声明顺序决定节点在圆周上的角度。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PanelKey {
    About,
    Skills,
    Experience,
    Projects,
}

impl PanelKey {
    pub const ALL: [PanelKey; 4] = [
        PanelKey::About,
        PanelKey::Skills,
        PanelKey::Experience,
        PanelKey::Projects,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PanelKey::About => "about",
            PanelKey::Skills => "skills",
            PanelKey::Experience => "experience",
            PanelKey::Projects => "projects",
        }
    }
}

impl fmt::Display for PanelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanelKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PanelKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown panel key: {s:?}"))
    }
}

/// 一段文本，`emphasized` 对应源文本中的 `**...**`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub emphasized: bool,
}

/// Splits `**bold**` markers into spans. An unmatched `**` is kept literally.
pub fn parse_emphasis(source: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut rest = source;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if open > 0 {
            spans.push(TextSpan { text: rest[..open].to_string(), emphasized: false });
        }
        spans.push(TextSpan { text: after_open[..close].to_string(), emphasized: true });
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(TextSpan { text: rest.to_string(), emphasized: false });
    }
    spans
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Paragraph(String),
    /// 小号大写的分组标题
    Heading(String),
    /// 标签列表（技能）
    Chips(Vec<String>),
    Entry {
        title: String,
        /// 右侧的日期或技术标签
        aside: Option<String>,
        subtitle: Option<String>,
        body: Option<String>,
        bullets: Vec<Vec<TextSpan>>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelContent {
    pub blocks: Vec<ContentBlock>,
}

impl PanelContent {
    /// 展平为带强调标记的文本片段，供 glyphon 富文本排版；相邻同类片段合并
    pub fn to_spans(&self) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        for block in &self.blocks {
            if !spans.is_empty() {
                push_span(&mut spans, "\n\n", false);
            }
            match block {
                ContentBlock::Paragraph(text) => {
                    for span in parse_emphasis(text) {
                        push_span(&mut spans, &span.text, span.emphasized);
                    }
                }
                ContentBlock::Heading(text) => push_span(&mut spans, &text.to_uppercase(), false),
                ContentBlock::Chips(items) => push_span(&mut spans, &items.join("  ·  "), false),
                ContentBlock::Entry { title, aside, subtitle, body, bullets } => {
                    push_span(&mut spans, title, false);
                    if let Some(aside) = aside {
                        push_span(&mut spans, &format!("    {aside}"), false);
                    }
                    if let Some(subtitle) = subtitle {
                        push_span(&mut spans, &format!("\n{subtitle}"), false);
                    }
                    if let Some(body) = body {
                        push_span(&mut spans, &format!("\n{body}"), false);
                    }
                    for bullet in bullets {
                        push_span(&mut spans, "\n•  ", false);
                        for span in bullet {
                            push_span(&mut spans, &span.text, span.emphasized);
                        }
                    }
                }
            }
        }
        spans
    }

    pub fn to_plain_text(&self) -> String {
        self.to_spans().into_iter().map(|span| span.text).collect()
    }
}

fn push_span(spans: &mut Vec<TextSpan>, text: &str, emphasized: bool) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.emphasized == emphasized => last.text.push_str(text),
        _ => spans.push(TextSpan { text: text.to_string(), emphasized }),
    }
}

pub struct PanelDefinition {
    pub key: PanelKey,
    pub title: String,
    render: fn(&ResumeData) -> PanelContent,
}

impl PanelDefinition {
    pub fn render(&self, resume: &ResumeData) -> PanelContent {
        (self.render)(resume)
    }
}

const SKILL_GROUPS: [(&str, &[&str]); 4] = [
    ("Frontend & UI", &["React", "Next.js", "Sveltekit", "Tailwind", "shadcnUI", "Astro"]),
    ("Backend & APIs", &["Node.js", "Express", "TypeScript", "GraphQL", "REST"]),
    ("Data & Infra", &["Postgres", "MongoDB", "Redis", "Docker", "Kubernetes", "AWS"]),
    ("Tooling", &["GitHub Actions"]),
];

const SKILLS_INTRO: &str =
    "Production-ready across modern JavaScript stacks, cloud infrastructure, and developer experience tooling.";

fn render_about(resume: &ResumeData) -> PanelContent {
    let mut blocks = vec![ContentBlock::Paragraph(resume.profile.clone())];

    let contacts = resume.personal.contact_lines();
    if !contacts.is_empty() {
        blocks.push(ContentBlock::Heading("Contact".to_string()));
        let lines: Vec<String> = contacts
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect();
        blocks.push(ContentBlock::Paragraph(lines.join("\n")));
    }

    if !resume.education.is_empty() {
        blocks.push(ContentBlock::Heading("Education".to_string()));
        for edu in &resume.education {
            blocks.push(ContentBlock::Entry {
                title: edu.degree.clone(),
                aside: Some(edu.dates.clone()),
                subtitle: Some(edu.school.clone()),
                body: None,
                bullets: edu.details.iter().map(|d| parse_emphasis(d)).collect(),
            });
        }
    }

    PanelContent { blocks }
}

fn render_skills(resume: &ResumeData) -> PanelContent {
    let mut blocks = vec![ContentBlock::Paragraph(SKILLS_INTRO.to_string())];
    for (group, candidates) in SKILL_GROUPS {
        let items: Vec<String> = candidates
            .iter()
            .filter(|item| resume.has_skill(item))
            .map(|item| item.to_string())
            .collect();
        if items.is_empty() {
            continue;
        }
        blocks.push(ContentBlock::Heading(group.to_string()));
        blocks.push(ContentBlock::Chips(items));
    }
    PanelContent { blocks }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_experience(resume: &ResumeData) -> PanelContent {
    let mut blocks: Vec<ContentBlock> = resume
        .experience
        .iter()
        .map(|role| ContentBlock::Entry {
            title: role.title.clone(),
            aside: Some(role.dates.clone()),
            subtitle: Some(role.company.clone()),
            body: None,
            bullets: role.bullets.iter().map(|b| parse_emphasis(b)).collect(),
        })
        .collect();

    for (heading, items) in [("Leadership", &resume.leadership), ("Open Source", &resume.open_source)] {
        if !items.is_empty() {
            blocks.push(ContentBlock::Heading(heading.to_string()));
            blocks.push(ContentBlock::Paragraph(bullet_list(items)));
        }
    }
    PanelContent { blocks }
}

fn render_projects(resume: &ResumeData) -> PanelContent {
    let blocks = resume
        .projects
        .iter()
        .map(|project| ContentBlock::Entry {
            title: project.name.clone(),
            aside: project.tech_label().map(str::to_string),
            subtitle: None,
            body: Some(project.description.clone()),
            bullets: Vec::new(),
        })
        .collect();
    PanelContent { blocks }
}

/// 固定的 PanelKey -> 标题 + 渲染函数 映射
pub struct PanelRegistry {
    definitions: Vec<PanelDefinition>,
}

impl PanelRegistry {
    pub fn new(resume: &ResumeData) -> Self {
        let definitions = PanelKey::ALL
            .into_iter()
            .map(|key| {
                let (title, render): (String, fn(&ResumeData) -> PanelContent) = match key {
                    PanelKey::About => (format!("About {}", resume.personal.first_name()), render_about),
                    PanelKey::Skills => ("Technical Skills".to_string(), render_skills),
                    PanelKey::Experience => ("Experience".to_string(), render_experience),
                    PanelKey::Projects => ("Projects".to_string(), render_projects),
                };
                PanelDefinition { key, title, render }
            })
            .collect();
        Self { definitions }
    }

    pub fn get(&self, key: PanelKey) -> &PanelDefinition {
        // definitions 按 PanelKey::ALL 的顺序构建
        &self.definitions[key.index()]
    }

    pub fn title(&self, key: PanelKey) -> &str {
        &self.get(key).title
    }

    pub fn keys(&self) -> impl Iterator<Item = PanelKey> + '_ {
        self.definitions.iter().map(|d| d.key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
