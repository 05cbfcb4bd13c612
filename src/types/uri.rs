//! Minimal URI handling for schema identifiers.
//!
//! Only what schema loading needs: split a URI into its parts, resolve a
//! relative reference against a base, and turn it back into text. Parsing
//! never fails; portions that cannot be recognised end up in the path.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri {
    pub scheme: String,
    pub user_info: String,
    pub host: String,
    pub port: String,
    /// Path segments. A leading empty segment marks a rooted path.
    pub path: Vec<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Uri {
    pub fn parse(text: &str) -> Self {
        let mut uri = Uri::default();
        let text = text.trim();

        let text = match text.split_once('#') {
            Some((rest, fragment)) => {
                uri.fragment = Some(fragment.to_string());
                rest
            }
            None => text,
        };

        let text = match text.split_once('?') {
            Some((rest, query)) => {
                uri.query = Some(query.to_string());
                rest
            }
            None => text,
        };

        let remainder = if let Some(authority) = text.strip_prefix("//") {
            uri.parse_authority(authority)
        } else {
            match text.split_once("://") {
                Some((scheme, rest)) if is_scheme(scheme) => {
                    uri.scheme = scheme.to_string();
                    uri.parse_authority(rest)
                }
                _ => text.to_string(),
            }
        };

        if !remainder.is_empty() {
            uri.path = remainder.split('/').map(str::to_string).collect();
        }

        uri
    }

    /// Parse `text` and resolve it against `base`.
    pub fn parse_with_base(text: &str, base: &str) -> Self {
        Self::parse(text).resolve(&Self::parse(base))
    }

    /// Splits `user@host:port/rest` and returns `/rest`.
    fn parse_authority(&mut self, text: &str) -> String {
        let text = match text.split_once('@') {
            Some((user_info, rest)) if !user_info.contains('/') => {
                self.user_info = user_info.to_string();
                rest
            }
            _ => text,
        };

        let (host_port, rest) = match text.find('/') {
            Some(index) => text.split_at(index),
            None => (text, ""),
        };

        if !host_port.is_empty() {
            let mut parts: Vec<&str> = host_port.split(':').collect();
            if parts.len() > 1 {
                if let Some(last) = parts.last().filter(|p| p.bytes().all(|b| b.is_ascii_digit())) {
                    self.port = last.to_string();
                    parts.pop();
                }
            }
            self.host = parts.join(":");
        }

        rest.to_string()
    }

    /// Resolve this (possibly relative) reference against `base`.
    ///
    /// When the resolved path equals the base path and this reference has no
    /// query of its own, the base query is kept, and the base fragment too if
    /// this reference has none.
    pub fn resolve(mut self, base: &Uri) -> Uri {
        if self.scheme.is_empty() {
            self.scheme = base.scheme.clone();
        }

        if !self.host.is_empty() {
            return self;
        }

        self.user_info = base.user_info.clone();
        self.host = base.host.clone();
        self.port = base.port.clone();

        if self.path.is_empty() {
            self.path = base.path.clone();
        } else if !self.path[0].is_empty() {
            let mut dirs: Vec<String> = base.path.clone();
            if dirs.first().is_some_and(|d| d.is_empty()) {
                dirs.remove(0);
            }
            dirs.pop();
            dirs.append(&mut self.path);

            let mut resolved = vec![String::new()];
            for dir in dirs {
                match dir.as_str() {
                    ".." => {
                        if resolved.len() > 1 {
                            resolved.pop();
                        }
                    }
                    "." => {}
                    _ => resolved.push(dir),
                }
            }
            self.path = resolved;
        }

        if self.path == base.path && self.query.is_none() {
            self.query = base.query.clone();
            if self.fragment.is_none() {
                self.fragment = base.fragment.clone();
            }
        }

        self
    }

    pub fn is_absolute(&self) -> bool {
        !self.scheme.is_empty() && !self.host.is_empty()
    }

    pub fn without_fragment(&self) -> Uri {
        Uri {
            fragment: None,
            ..self.clone()
        }
    }

    /// Whether the port can be left out because it is the scheme's default.
    pub fn has_default_port(&self) -> bool {
        if self.port.is_empty() {
            return true;
        }

        let port = self.port.parse::<u16>().ok();
        match self.scheme.to_ascii_lowercase().as_str() {
            "http" => port == Some(80),
            "https" => port == Some(443),
            _ => false,
        }
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }
        if !self.scheme.is_empty() || !self.host.is_empty() {
            f.write_str("//")?;
        }
        if !self.user_info.is_empty() {
            write!(f, "{}@", self.user_info)?;
        }
        f.write_str(&self.host)?;
        if !self.has_default_port() {
            write!(f, ":{}", self.port)?;
        }

        match self.path.first() {
            None => {
                if !self.host.is_empty() {
                    f.write_str("/")?;
                }
            }
            Some(first) => {
                if !first.is_empty() && (!self.host.is_empty() || !self.scheme.is_empty()) {
                    f.write_str("/")?;
                }
                f.write_str(&self.path.join("/"))?;
            }
        }

        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.fragment.as_deref().filter(|q| !q.is_empty()) {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Uri::parse(s))
    }
}

/// Resolve `relative` against `base` and render the result.
pub fn resolve_uri(relative: &str, base: &str) -> String {
    Uri::parse_with_base(relative, base).to_string()
}
