use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{Enrollment, Payment};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct OrderBody {
    pub course_id: Uuid,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OrderCompletedResponse {
    pub payment: Payment,
    pub enrollment: Enrollment,
}
