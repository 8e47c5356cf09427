/// Icon shown next to a category, resolved from the category's tag.
///
/// The mapping is a closed enum rather than a runtime name lookup, so an
/// unknown tag degrades to the fallback icon instead of failing to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryIcon {
    Briefcase,
    Rocket,
    GraduationCap,
    LineChart,
    Users,
    MessageCircle,
    HelpCircle,
    Tag,
}

impl CategoryIcon {
    pub fn for_tag(tag: &str) -> Self {
        match tag {
            "careers" => Self::Briefcase,
            "pitches" => Self::Rocket,
            "mentoring" => Self::GraduationCap,
            "analytics" => Self::LineChart,
            "community" => Self::Users,
            "discussions" => Self::MessageCircle,
            "help" => Self::HelpCircle,
            _ => Self::Tag,
        }
    }

    /// Stable identifier used by the rendering layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Briefcase => "briefcase",
            Self::Rocket => "rocket",
            Self::GraduationCap => "graduation-cap",
            Self::LineChart => "line-chart",
            Self::Users => "users",
            Self::MessageCircle => "message-circle",
            Self::HelpCircle => "help-circle",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for CategoryIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_resolve() {
        assert_eq!(CategoryIcon::for_tag("pitches"), CategoryIcon::Rocket);
        assert_eq!(CategoryIcon::for_tag("mentoring"), CategoryIcon::GraduationCap);
    }

    #[test]
    fn unknown_tag_falls_back() {
        assert_eq!(CategoryIcon::for_tag("something-new"), CategoryIcon::Tag);
        assert_eq!(CategoryIcon::for_tag(""), CategoryIcon::Tag);
    }
}
