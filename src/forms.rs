//! Server-side validation for the two submission forms.
//!
//! Every field owns an ordered list of `(Rule, message)` pairs. Rules run in
//! order and each failure adds its message to the field; a failing rule that
//! [halts](Rule::halts) ends the chain for that field so an empty value does
//! not also report a length or range problem.

use std::collections::BTreeMap;

use axum::{body::Bytes, extract::Multipart};
use serde::Deserialize;

use crate::{config::Config, error::AppResult, upload};

pub const TITLE_MAX_CHARS: usize = 255;
pub const NAME_MAX_CHARS: usize = 64;
pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 10;
pub const DEFAULT_SCORE: &str = "10";

pub const DUPLICATE_TITLE: &str = "A movie with this title already exists!";
pub const COVER_NOT_ALLOWED: &str = "Only PNG/JPG are allowed!";

/// Field name to the messages collected for it, in rule order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    fn check(&mut self, field: &'static str, value: Value<'_>, rules: &[(Rule<'_>, &str)]) {
        for (rule, message) in rules {
            if !rule.passes(value) {
                self.add(field, *message);
                if rule.halts() {
                    break;
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Value<'a> {
    Text(&'a str),
    File(Option<&'a UploadedFile>),
}

#[derive(Clone, Copy, Debug)]
enum Rule<'a> {
    /// Non-blank after trimming.
    Required,
    MaxChars(usize),
    WholeNumber,
    Between(i64, i64),
    FileRequired,
    FileExtension(&'a [String]),
}

impl Rule<'_> {
    fn passes(&self, value: Value<'_>) -> bool {
        match (self, value) {
            (Rule::Required, Value::Text(s)) => !s.trim().is_empty(),
            (Rule::MaxChars(max), Value::Text(s)) => s.chars().count() <= *max,
            (Rule::WholeNumber, Value::Text(s)) => parse_int(s).is_some(),
            (Rule::Between(min, max), Value::Text(s)) => {
                parse_int(s).is_some_and(|n| (*min..=*max).contains(&n))
            },
            (Rule::FileRequired, Value::File(file)) => file.is_some(),
            (Rule::FileExtension(allowed), Value::File(file)) => {
                file.is_some_and(|f| upload::extension_allowed(&f.file_name, allowed))
            },
            _ => false,
        }
    }

    fn halts(&self) -> bool {
        matches!(self, Rule::Required | Rule::WholeNumber | Rule::FileRequired)
    }
}

fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

/// A form that can be checked against its rules.
pub trait Form {
    type Valid;

    fn validate(&self, config: &Config) -> Result<Self::Valid, FormErrors>;
}

#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw values of the add-movie form, kept for re-display.
#[derive(Clone, Debug, Default)]
pub struct MovieForm {
    pub title: String,
    pub description: String,
    pub cover: Option<UploadedFile>,
}

#[derive(Clone, Debug)]
pub struct ValidMovie {
    pub title: String,
    pub description: String,
    pub cover: UploadedFile,
}

impl MovieForm {
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.title = field.text().await?,
                "description" => form.description = field.text().await?,
                "cover" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    // browsers send an empty part with no file name when nothing was picked
                    if !file_name.is_empty() {
                        form.cover = Some(UploadedFile { file_name, content_type, data });
                    }
                },
                _ => {
                    field.bytes().await?;
                },
            }
        }
        Ok(form)
    }
}

impl Form for MovieForm {
    type Valid = ValidMovie;

    fn validate(&self, config: &Config) -> Result<ValidMovie, FormErrors> {
        let mut errors = FormErrors::default();
        errors.check(
            "title",
            Value::Text(&self.title),
            &[
                (Rule::Required, "Title cant be empty!"),
                (Rule::MaxChars(TITLE_MAX_CHARS), "Title is too big!"),
            ],
        );
        errors.check(
            "description",
            Value::Text(&self.description),
            &[(Rule::Required, "Description cant be empty!")],
        );
        errors.check(
            "cover",
            Value::File(self.cover.as_ref()),
            &[
                (Rule::FileRequired, "Cover cant be empty!"),
                (Rule::FileExtension(&config.cover_extensions), COVER_NOT_ALLOWED),
            ],
        );

        match &self.cover {
            Some(cover) if errors.is_empty() => Ok(ValidMovie {
                title: self.title.clone(),
                description: self.description.clone(),
                cover: cover.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Raw values of the review form. Every field defaults to empty so a missing
/// field becomes a validation message rather than an extractor rejection.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ReviewForm {
    pub name: String,
    pub text: String,
    pub score: String,
}

impl Default for ReviewForm {
    fn default() -> Self {
        Self { name: String::new(), text: String::new(), score: DEFAULT_SCORE.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidReview {
    pub name: String,
    pub text: String,
    pub score: i32,
}

impl Form for ReviewForm {
    type Valid = ValidReview;

    fn validate(&self, _config: &Config) -> Result<ValidReview, FormErrors> {
        let mut errors = FormErrors::default();
        errors.check(
            "name",
            Value::Text(&self.name),
            &[
                (Rule::Required, "Name cant be empty!"),
                (Rule::MaxChars(NAME_MAX_CHARS), "Name is too big!"),
            ],
        );
        errors.check("text", Value::Text(&self.text), &[(Rule::Required, "Text cant be empty!")]);
        errors.check(
            "score",
            Value::Text(&self.score),
            &[
                (Rule::Required, "Score cant be empty!"),
                (Rule::WholeNumber, "Not a valid choice."),
                (Rule::Between(SCORE_MIN, SCORE_MAX), "Score should be from 0 to 10!"),
            ],
        );

        match parse_int(&self.score).and_then(|n| i32::try_from(n).ok()) {
            Some(score) if errors.is_empty() => {
                Ok(ValidReview { name: self.name.clone(), text: self.text.clone(), score })
            },
            _ => Err(errors),
        }
    }
}
