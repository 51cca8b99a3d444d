//! Staff repository.

use super::shared;
use crate::client::RecordClient;
use crate::error::RecordResult;
use crate::models::{Entity, Staff, StaffDraft};
use crate::store::{Condition, FetchQuery};
use ward_types::RecordId;

#[derive(Clone, Debug)]
pub struct StaffRepository {
    client: RecordClient,
}

impl StaffRepository {
    pub fn new(client: RecordClient) -> Self {
        Self { client }
    }

    fn query() -> FetchQuery {
        FetchQuery::new(Staff::FIELDS)
    }

    pub async fn get_all(&self) -> RecordResult<Vec<Staff>> {
        shared::fetch_all(&self.client, "get_all", Self::query()).await
    }

    pub async fn get_by_id(&self, id: RecordId) -> RecordResult<Staff> {
        shared::fetch_one(&self.client, id).await
    }

    pub async fn create(&self, draft: &StaffDraft) -> RecordResult<Staff> {
        let staff: Staff = shared::create_one(&self.client, draft.to_record()?).await?;
        tracing::info!(id = %staff.id, "created staff member");
        Ok(staff)
    }

    pub async fn update(&self, id: RecordId, draft: &StaffDraft) -> RecordResult<Staff> {
        shared::update_one(&self.client, id, draft.to_record()?).await
    }

    pub async fn delete(&self, id: RecordId) -> RecordResult<()> {
        shared::delete_one::<Staff>(&self.client, id).await
    }

    pub async fn get_by_department(&self, department: &str) -> RecordResult<Vec<Staff>> {
        self.filtered("get_by_department", "department_c", department)
            .await
    }

    pub async fn get_by_role(&self, role: &str) -> RecordResult<Vec<Staff>> {
        self.filtered("get_by_role", "role_c", role).await
    }

    pub async fn get_by_shift(&self, shift: &str) -> RecordResult<Vec<Staff>> {
        self.filtered("get_by_shift", "shift_c", shift).await
    }

    async fn filtered(
        &self,
        op: &'static str,
        field: &str,
        value: &str,
    ) -> RecordResult<Vec<Staff>> {
        let query = Self::query().filter(Condition::equal_to(field, value));
        shared::fetch_all(&self.client, op, query).await
    }
}
