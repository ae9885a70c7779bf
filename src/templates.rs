use maud::{DOCTYPE, Markup, html};

use crate::{
    entities::{movie, review},
    forms::{FormErrors, MovieForm, ReviewForm, SCORE_MAX, SCORE_MIN},
    models::MovieDetail,
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

const INPUT_CLASS: &str = "mt-2 w-full rounded-md border border-gray-300 px-3 py-2 focus:border-blue-500 focus:outline-none focus:ring-1 focus:ring-blue-500";
const BUTTON_CLASS: &str =
    "w-full rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700";

pub fn home_page(movies: &[movie::Model]) -> String {
    page(
        "Movies",
        html! {
            div class="max-w-4xl mx-auto px-6 py-10" {
                div class="flex items-start justify-between gap-6" {
                    h1 class="text-3xl font-bold text-gray-900" { "Movies" }
                    a class="text-sm text-blue-600 hover:text-blue-800" href="/add-movie" { "Add movie" }
                }

                @if movies.is_empty() {
                    div class="mt-10 bg-white shadow rounded-lg p-8" {
                        p class="text-gray-600" { "No movies yet." }
                    }
                } @else {
                    div class="mt-10 grid gap-6 sm:grid-cols-2 md:grid-cols-3" {
                        @for movie in movies {
                            (movie_card(movie))
                        }
                    }
                }
            }
        },
    )
}

pub fn movie_page(detail: &MovieDetail, form: &ReviewForm, errors: &FormErrors) -> String {
    let movie = &detail.movie;
    page(
        &movie.title,
        html! {
            div class="max-w-3xl mx-auto px-6 py-10" {
                a class="text-sm text-blue-600 hover:text-blue-800" href="/" { "All movies" }

                div class="mt-6 bg-white shadow rounded-lg p-6 flex gap-6" {
                    img class="w-40 rounded" src=(cover_url(movie)) alt=(movie.title);
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { (movie.title) }
                        p class="mt-2 text-gray-500" {
                            "Average score: "
                            span id="average-score" class="font-semibold text-gray-900" { (detail.average_score) }
                            " (" (detail.reviews.len()) " reviews)"
                        }
                        p class="mt-4 text-gray-700 whitespace-pre-line" { (movie.description) }
                    }
                }

                h2 class="mt-10 text-xl font-semibold text-gray-900" { "Reviews" }
                @if detail.reviews.is_empty() {
                    p class="mt-2 text-gray-500" { "No reviews yet." }
                } @else {
                    ul class="mt-4 space-y-4" {
                        @for review in &detail.reviews {
                            (review_item(review))
                        }
                    }
                }

                (review_form(movie.id, form, errors))
            }
        },
    )
}

pub fn add_movie_page(form: &MovieForm, errors: &FormErrors) -> String {
    page(
        "Add movie",
        html! {
            div class="max-w-2xl mx-auto px-6 py-12" {
                div class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-3xl font-bold text-gray-900" { "Add movie" }

                    form class="mt-8 space-y-6" method="post" action="/add-movie" enctype="multipart/form-data" {
                        div {
                            label class="block text-sm font-medium text-gray-700" for="title" { "Title" }
                            input class=(INPUT_CLASS) name="title" id="title" value=(form.title);
                            (field_errors(errors, "title"))
                        }

                        div {
                            label class="block text-sm font-medium text-gray-700" for="description" { "Description" }
                            textarea class=(INPUT_CLASS) name="description" id="description" rows="5" { (form.description) }
                            (field_errors(errors, "description"))
                        }

                        div {
                            label class="block text-sm font-medium text-gray-700" for="cover" { "Cover" }
                            input class="mt-2" type="file" name="cover" id="cover" accept=".png,.jpg";
                            (field_errors(errors, "cover"))
                        }

                        button class=(BUTTON_CLASS) type="submit" { "Add" }
                    }
                }
            }
        },
    )
}

pub fn error_page(message: String) -> String {
    page(
        "Error",
        html! {
            div class="min-h-screen bg-gray-50 flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { "Error" }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

fn page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body class="bg-gray-50" { (body) }
        }
    }
    .into_string()
}

fn cover_url(movie: &movie::Model) -> String {
    format!("/covers/{}", movie.cover)
}

fn movie_card(movie: &movie::Model) -> Markup {
    html! {
        a class="block bg-white shadow rounded-lg p-4 hover:shadow-md" href=(format!("/movie/{}", movie.id)) {
            img class="w-full rounded" src=(cover_url(movie)) alt=(movie.title);
            h2 class="mt-3 text-lg font-semibold text-gray-900" { (movie.title) }
        }
    }
}

fn review_item(review: &review::Model) -> Markup {
    html! {
        li class="bg-white shadow rounded-lg p-4" {
            div class="flex items-center justify-between" {
                span class="font-medium text-gray-900" { (review.name) }
                span class="text-sm text-gray-500" { (review.score) " / " (SCORE_MAX) }
            }
            p class="mt-2 text-gray-700 whitespace-pre-line" { (review.text) }
        }
    }
}

fn review_form(movie_id: i32, form: &ReviewForm, errors: &FormErrors) -> Markup {
    let selected = form.score.trim();
    html! {
        form class="mt-10 bg-white shadow rounded-lg p-6 space-y-6" method="post" action=(format!("/movie/{movie_id}")) {
            h2 class="text-xl font-semibold text-gray-900" { "Leave a review" }

            div {
                label class="block text-sm font-medium text-gray-700" for="name" { "Name" }
                input class=(INPUT_CLASS) name="name" id="name" value=(form.name);
                (field_errors(errors, "name"))
            }

            div {
                label class="block text-sm font-medium text-gray-700" for="text" { "Text" }
                textarea class=(INPUT_CLASS) name="text" id="text" rows="4" { (form.text) }
                (field_errors(errors, "text"))
            }

            div {
                label class="block text-sm font-medium text-gray-700" for="score" { "Score" }
                select class=(INPUT_CLASS) name="score" id="score" {
                    @for score in SCORE_MIN..=SCORE_MAX {
                        option value=(score) selected[selected == score.to_string()] { (score) }
                    }
                }
                (field_errors(errors, "score"))
            }

            button class=(BUTTON_CLASS) type="submit" { "Send" }
        }
    }
}

fn field_errors(errors: &FormErrors, field: &str) -> Markup {
    html! {
        @for message in errors.field(field) {
            p class="mt-2 text-sm text-red-600" { (message) }
        }
    }
}
