use regex::bytes::Regex as BytesRegex;
use regex::Regex;

/// One classification rule: display classes plus the compiled matchers that
/// select it. Created once at table-load time and shared by reference across
/// every lookup that resolves to it.
#[derive(Debug)]
pub struct Icon {
    slug: String,
    index: usize,
    icon_class: String,
    colour_class: Option<String>,
    pub(crate) match_name: Option<Regex>,
    pub(crate) match_path: Option<Regex>,
    pub(crate) match_interpreter: Option<Regex>,
    pub(crate) match_language: Option<Regex>,
    pub(crate) match_scope: Option<Regex>,
    pub(crate) match_signature: Option<BytesRegex>,
}

impl Icon {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        slug: String,
        index: usize,
        icon_class: String,
        colour_class: Option<String>,
        match_name: Option<Regex>,
        match_path: Option<Regex>,
        match_interpreter: Option<Regex>,
        match_language: Option<Regex>,
        match_scope: Option<Regex>,
        match_signature: Option<BytesRegex>,
    ) -> Self {
        Self {
            slug,
            index,
            icon_class,
            colour_class,
            match_name,
            match_path,
            match_interpreter,
            match_language,
            match_scope,
            match_signature,
        }
    }

    /// Stable identifier of the rule, e.g. `"python"`.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Position of this icon in its table's authoritative `by_name` list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn icon_class(&self) -> &str {
        &self.icon_class
    }

    pub fn colour_class(&self) -> Option<&str> {
        self.colour_class.as_deref()
    }

    /// The CSS-style display classes: primary class, plus the colour variant
    /// when colouring is on and the rule has one.
    pub fn display_classes(&self, coloured: bool) -> Vec<String> {
        let mut classes = vec![self.icon_class.clone()];
        if coloured {
            if let Some(colour) = &self.colour_class {
                classes.push(colour.clone());
            }
        }
        classes
    }

    pub(crate) fn matches_name(&self, name: &str) -> bool {
        self.match_name.as_ref().is_some_and(|re| re.is_match(name))
    }

    pub(crate) fn matches_path(&self, path: &str) -> bool {
        self.match_path.as_ref().is_some_and(|re| re.is_match(path))
    }

    pub(crate) fn matches_interpreter(&self, interpreter: &str) -> bool {
        self.match_interpreter
            .as_ref()
            .is_some_and(|re| re.is_match(interpreter))
    }

    pub(crate) fn matches_language(&self, language: &str) -> bool {
        self.match_language
            .as_ref()
            .is_some_and(|re| re.is_match(language))
    }

    pub(crate) fn matches_scope(&self, scope: &str) -> bool {
        self.match_scope.as_ref().is_some_and(|re| re.is_match(scope))
    }

    pub(crate) fn matches_signature(&self, bytes: &[u8]) -> bool {
        self.match_signature
            .as_ref()
            .is_some_and(|re| re.is_match(bytes))
    }
}
