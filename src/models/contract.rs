// src/models/contract.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

// Contrato de locação (1:1 com o lead, buscado por lead_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub consultant_id: Option<Uuid>,
    #[schema(example = "Fiat")]
    pub brand: String,
    #[schema(example = "500e")]
    pub model: String,
    pub trim_level: Option<String>,
    #[schema(example = "349.90")]
    pub monthly_payment: Decimal,
    #[schema(example = 36)]
    pub term_months: i32,
    pub annual_km: Option<i32>,
    pub down_payment: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub provider: Option<String>,
    pub contract_number: Option<String>,
    pub notes: Option<String>,
    pub signed_on: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub delivered_on: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    pub fn apply_terms(&mut self, terms: ContractTerms) {
        self.brand = terms.brand;
        self.model = terms.model;
        self.trim_level = terms.trim_level;
        self.monthly_payment = terms.monthly_payment;
        self.term_months = terms.term_months;
        self.annual_km = terms.annual_km;
        self.down_payment = terms.down_payment;
        self.commission = terms.commission;
        self.provider = terms.provider;
        self.contract_number = terms.contract_number;
        self.notes = terms.notes;
        self.signed_on = terms.signed_on;
        self.expected_delivery = terms.expected_delivery;
        self.delivered_on = terms.delivered_on;
    }
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractTerms {
    #[validate(length(min = 1, max = 60, message = "Marca obrigatória"))]
    pub brand: String,
    #[validate(length(min = 1, max = 60, message = "Modelo obrigatório"))]
    pub model: String,
    pub trim_level: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    pub monthly_payment: Decimal,
    #[validate(range(min = 1, max = 120, message = "Duração entre 1 e 120 meses"))]
    pub term_months: i32,
    #[validate(range(min = 0))]
    pub annual_km: Option<i32>,
    #[validate(custom(function = "validate_not_negative"))]
    pub down_payment: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub commission: Option<Decimal>,
    pub provider: Option<String>,
    pub contract_number: Option<String>,
    pub notes: Option<String>,
    pub signed_on: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub delivered_on: Option<NaiveDate>,
}
