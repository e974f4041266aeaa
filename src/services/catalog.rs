//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        title::{CreateTitle, UpdateTitle},
        Actor, Reservation, TitleDetails,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All titles in catalog order
    pub async fn list_titles(&self) -> Vec<TitleDetails> {
        self.repository
            .read(|desk| {
                desk.catalog()
                    .iter()
                    .map(|title| TitleDetails::new(title, desk.queue().len(title.id)))
                    .collect()
            })
            .await
    }

    pub async fn get_title(&self, id: i32) -> AppResult<TitleDetails> {
        Ok(self.repository.read(|desk| desk.title_details(id)).await?)
    }

    pub async fn create_title(
        &self,
        actor: &Actor,
        request: CreateTitle,
    ) -> AppResult<TitleDetails> {
        actor.require_staff()?;
        request.validate()?;

        let title = self
            .repository
            .transact(|desk| Ok::<_, AppError>(desk.add_title(request)))
            .await?;

        tracing::info!(title_id = title.id, title = %title.title, "Title created");
        Ok(TitleDetails::new(&title, 0))
    }

    pub async fn update_title(
        &self,
        actor: &Actor,
        id: i32,
        update: UpdateTitle,
    ) -> AppResult<TitleDetails> {
        actor.require_staff()?;
        update.validate()?;

        let details = self
            .repository
            .transact(|desk| {
                desk.update_title(id, update)?;
                Ok::<_, AppError>(desk.title_details(id)?)
            })
            .await?;

        tracing::info!(title_id = id, "Title updated");
        Ok(details)
    }

    /// Delete a title with no copies out
    pub async fn delete_title(&self, actor: &Actor, id: i32) -> AppResult<()> {
        actor.require_staff()?;

        let removed = self
            .repository
            .transact(|desk| desk.remove_title(id))
            .await?;

        tracing::info!(title_id = id, title = %removed.title, "Title deleted");
        Ok(())
    }

    /// Waitlist of a title, head first
    pub async fn list_reservations(&self, actor: &Actor, id: i32) -> AppResult<Vec<Reservation>> {
        actor.require_staff()?;

        let entries = self
            .repository
            .read(|desk| desk.catalog().get(id).map(|_| desk.queue().entries(id)))
            .await?;
        Ok(entries)
    }
}
