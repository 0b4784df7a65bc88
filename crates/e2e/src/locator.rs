//! Typed locator chains
//!
//! A locator is an ordered list of selector segments; each segment is
//! resolved inside the element matched by the one before it, the same way
//! `page.getByTestId('plan').getByRole('button', { name })` scopes in
//! Playwright. The `Display` form is stable and doubles as the diagnostic
//! printed when an expectation on the locator fails.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single segment of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// `data-testid` attribute
    TestId { id: String },

    /// `title` attribute
    Title { text: String, exact: bool },

    /// ARIA role with an optional accessible name filter
    Role { role: String, name: Option<String> },

    /// Text content
    Text { text: String, exact: bool },
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::TestId { id } => write!(f, "testid={}", id),
            Selector::Title { text, exact: true } => write!(f, "title=\"{}\"s", text),
            Selector::Title { text, exact: false } => write!(f, "title=\"{}\"", text),
            Selector::Role { role, name: Some(name) } => {
                write!(f, "role={}[name=\"{}\"]", role, name)
            }
            Selector::Role { role, name: None } => write!(f, "role={}", role),
            Selector::Text { text, exact: true } => write!(f, "text=\"{}\"s", text),
            Selector::Text { text, exact: false } => write!(f, "text=\"{}\"", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    chain: Vec<Selector>,
}

impl Locator {
    /// Root locator matching a test identifier
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::root(Selector::TestId { id: id.into() })
    }

    /// Root locator matching a title substring
    pub fn title(text: impl Into<String>) -> Self {
        Self::root(Selector::Title { text: text.into(), exact: false })
    }

    /// Root locator matching a title exactly
    pub fn title_exact(text: impl Into<String>) -> Self {
        Self::root(Selector::Title { text: text.into(), exact: true })
    }

    fn root(selector: Selector) -> Self {
        Self { chain: vec![selector] }
    }

    fn then(&self, selector: Selector) -> Self {
        let mut chain = self.chain.clone();
        chain.push(selector);
        Self { chain }
    }

    pub fn get_by_test_id(&self, id: impl Into<String>) -> Self {
        self.then(Selector::TestId { id: id.into() })
    }

    pub fn get_by_title(&self, text: impl Into<String>) -> Self {
        self.then(Selector::Title { text: text.into(), exact: false })
    }

    pub fn get_by_title_exact(&self, text: impl Into<String>) -> Self {
        self.then(Selector::Title { text: text.into(), exact: true })
    }

    pub fn get_by_role(&self, role: impl Into<String>) -> Self {
        self.then(Selector::Role { role: role.into(), name: None })
    }

    pub fn get_by_role_named(&self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.then(Selector::Role { role: role.into(), name: Some(name.into()) })
    }

    pub fn button(&self, name: impl Into<String>) -> Self {
        self.get_by_role_named("button", name)
    }

    pub fn get_by_text(&self, text: impl Into<String>) -> Self {
        self.then(Selector::Text { text: text.into(), exact: false })
    }

    pub fn get_by_text_exact(&self, text: impl Into<String>) -> Self {
        self.then(Selector::Text { text: text.into(), exact: true })
    }

    pub fn chain(&self) -> &[Selector] {
        &self.chain
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.chain.iter().enumerate() {
            if i > 0 {
                write!(f, " >> ")?;
            }
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}
