use crate::entities::{movie, review};

/// A movie with its reviews loaded, as shown on the detail page.
#[derive(Clone, Debug)]
pub struct MovieDetail {
    pub movie: movie::Model,
    pub reviews: Vec<review::Model>,
    pub average_score: f64,
}

impl MovieDetail {
    pub fn new(movie: movie::Model, reviews: Vec<review::Model>) -> Self {
        let average_score = average_score(&reviews);
        Self { movie, reviews, average_score }
    }
}

/// Mean score rounded to two decimals, `0.0` without reviews.
pub fn average_score(reviews: &[review::Model]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: i64 = reviews.iter().map(|r| i64::from(r.score)).sum();
    let mean = total as f64 / reviews.len() as f64;
    (mean * 100.0).round() / 100.0
}
