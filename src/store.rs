use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};

use crate::{
    entities::{movie, review},
    error::{StoreError, StoreResult},
};

#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_movies(&self) -> StoreResult<Vec<movie::Model>> {
        let movies = movie::Entity::find().order_by_asc(movie::Column::Id).all(&self.db).await?;
        Ok(movies)
    }

    pub async fn get_movie(&self, id: i32) -> StoreResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Reviews of one movie, oldest first.
    pub async fn reviews_for(&self, movie_id: i32) -> StoreResult<Vec<review::Model>> {
        let reviews = review::Entity::find()
            .filter(review::Column::MovieId.eq(movie_id))
            .order_by_asc(review::Column::Id)
            .all(&self.db)
            .await?;
        Ok(reviews)
    }

    pub async fn title_taken(&self, title: &str) -> StoreResult<bool> {
        let count = movie::Entity::find()
            .filter(movie::Column::Title.eq(title))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert_movie(
        &self,
        title: &str,
        description: &str,
        cover: &str,
    ) -> StoreResult<movie::Model> {
        let model = movie::ActiveModel {
            id: Default::default(),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            cover: Set(cover.to_string()),
            created: Set(now_sec()),
        };

        let res = movie::Entity::insert(model).exec_with_returning(&self.db).await;
        match res {
            Ok(movie) => {
                tracing::debug!(movie_id = movie.id, "movie inserted");
                Ok(movie)
            },
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(StoreError::ConstraintViolation(title.to_string()))
            },
            Err(err) => Err(err.into()),
        }
    }

    pub async fn insert_review(
        &self,
        movie_id: i32,
        name: &str,
        text: &str,
        score: i32,
    ) -> StoreResult<review::Model> {
        let txn = self.db.begin().await?;

        if movie::Entity::find_by_id(movie_id).one(&txn).await?.is_none() {
            return Err(StoreError::NotFound(movie_id));
        }

        let model = review::ActiveModel {
            id: Default::default(),
            name: Set(name.to_string()),
            text: Set(text.to_string()),
            score: Set(score),
            movie_id: Set(movie_id),
            created: Set(now_sec()),
        };
        let review = review::Entity::insert(model).exec_with_returning(&txn).await?;

        txn.commit().await?;

        tracing::debug!(movie_id, review_id = review.id, score, "review inserted");
        Ok(review)
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
