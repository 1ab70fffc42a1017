use std::fmt;
use url::Url;

/// A unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The portal landing page; handling it lists and filters courses
    Root { url: Url },

    /// A course page holding blocks of resource links
    CoursePage { url: Url },

    /// A resource page (or direct file) found inside a course block
    FilePage {
        url: Url,
        display_name: String,
        block_name: String,
        course_name: String,
    },
}

impl Target {
    pub fn root(url: Url) -> Self {
        Target::Root { url }
    }

    pub fn course(url: Url) -> Self {
        Target::CoursePage { url }
    }

    pub fn url(&self) -> &Url {
        match self {
            Target::Root { url } | Target::CoursePage { url } | Target::FilePage { url, .. } => url,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Root { .. } => "root",
            Target::CoursePage { .. } => "course",
            Target::FilePage { .. } => "file",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.url())
    }
}
