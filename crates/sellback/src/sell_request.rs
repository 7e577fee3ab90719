//! Sell request entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recommerce_core::{Address, Cents, DomainError, DomainResult, Entity, SellRequestId, UserId};

use crate::status::SellRequestStatus;

/// Whether the shop buys the item outright or sells it on consignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SellType {
    Undecided,
    BuyBack,
    Sell,
}

/// Description of the item being offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub brand: String,
    pub category: String,
    pub name: String,
    pub size: String,
    pub condition: String,
    pub purchase_year: String,
    pub original_price: Cents,
    pub attachments: String,
    pub description: String,
}

/// Side effects of a sell request status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellRequestEffect {
    /// The sale completed: credit the user with the agreed valuation.
    CreditSale { amount: Cents },
}

/// A user's proposal to sell or consign an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellRequest {
    id: SellRequestId,
    user_id: UserId,
    pub details: ItemDetails,
    status: SellRequestStatus,
    buy_back_valuation: Option<Cents>,
    sell_valuation: Option<Cents>,
    valuated_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    sell_type: SellType,
    sender_address: Option<Address>,
    pub express_company: Option<String>,
    pub tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl SellRequest {
    pub fn create(
        id: SellRequestId,
        user_id: UserId,
        details: ItemDetails,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if details.brand.trim().is_empty() {
            return Err(DomainError::validation("sell request brand is empty"));
        }
        Ok(Self {
            id,
            user_id,
            details,
            status: SellRequestStatus::Created,
            buy_back_valuation: None,
            sell_valuation: None,
            valuated_at: None,
            completed_at: None,
            sell_type: SellType::Undecided,
            sender_address: None,
            express_company: None,
            tracking_number: None,
            created_at: now,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> SellRequestStatus {
        self.status
    }

    pub fn sell_type(&self) -> SellType {
        self.sell_type
    }

    pub fn valuated_at(&self) -> Option<DateTime<Utc>> {
        self.valuated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn sender_address(&self) -> Option<&Address> {
        self.sender_address.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The valuation the user would be paid under the chosen sell type.
    pub fn agreed_valuation(&self) -> Option<Cents> {
        match self.sell_type {
            SellType::BuyBack => self.buy_back_valuation,
            SellType::Sell => self.sell_valuation,
            SellType::Undecided => None,
        }
    }

    /// Staff valuation: records the offers and moves to `valuated`.
    pub fn valuate(
        &mut self,
        buy_back_valuation: Option<Cents>,
        sell_valuation: Option<Cents>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<SellRequestEffect>> {
        if buy_back_valuation.is_none() && sell_valuation.is_none() {
            return Err(DomainError::validation(
                "valuation requires at least one offer",
            ));
        }
        SellRequestStatus::graph().check(self.status, SellRequestStatus::Valuated)?;
        self.buy_back_valuation = buy_back_valuation;
        self.sell_valuation = sell_valuation;
        self.transition(SellRequestStatus::Valuated, now)
    }

    /// The user accepts a valuation: picks a sell type, snapshots the sender
    /// address, and moves to `decided`. One atomic operation.
    pub fn decide(
        &mut self,
        sell_type: SellType,
        sender_address: Address,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<SellRequestEffect>> {
        if sell_type == SellType::Undecided {
            return Err(DomainError::validation("sell type must be decided"));
        }
        SellRequestStatus::graph().check(self.status, SellRequestStatus::Decided)?;
        if self.status == SellRequestStatus::Decided {
            return Err(DomainError::conflict("sell request is already decided"));
        }
        sender_address.validate()?;

        let chosen = match sell_type {
            SellType::BuyBack => self.buy_back_valuation,
            SellType::Sell => self.sell_valuation,
            SellType::Undecided => unreachable!(),
        };
        if chosen.is_none() {
            return Err(DomainError::validation(
                "no valuation offered for the chosen sell type",
            ));
        }

        self.sell_type = sell_type;
        self.sender_address = Some(sender_address);
        self.transition(SellRequestStatus::Decided, now)
    }

    /// Request a status change.
    ///
    /// `valuated` stamps the valuation timestamp; `done` stamps completion
    /// and yields the payout effect for the agreed valuation.
    pub fn transition(
        &mut self,
        dst: SellRequestStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<SellRequestEffect>> {
        SellRequestStatus::graph().check(self.status, dst)?;
        if self.status == dst {
            return Ok(Vec::new());
        }
        // Reaching `decided` requires the decision operation to have chosen
        // a sell type; `done` pays out, so it needs the agreed valuation.
        if dst == SellRequestStatus::Decided && self.sell_type == SellType::Undecided {
            return Err(DomainError::validation(
                "cannot mark decided without a sell type decision",
            ));
        }
        let payout = if dst == SellRequestStatus::Done {
            Some(self.agreed_valuation().ok_or_else(|| {
                DomainError::validation("cannot complete without an agreed valuation")
            })?)
        } else {
            None
        };

        self.status = dst;
        match dst {
            SellRequestStatus::Valuated => self.valuated_at = Some(now),
            SellRequestStatus::Done => self.completed_at = Some(now),
            _ => {}
        }

        Ok(match payout {
            Some(amount) => vec![SellRequestEffect::CreditSale { amount }],
            None => Vec::new(),
        })
    }

    /// Express/tracking info for the inbound shipment.
    pub fn set_tracking(
        &mut self,
        express_company: impl Into<String>,
        tracking_number: impl Into<String>,
    ) -> DomainResult<()> {
        match self.status {
            SellRequestStatus::Decided | SellRequestStatus::Shipping => {
                self.express_company = Some(express_company.into());
                self.tracking_number = Some(tracking_number.into());
                Ok(())
            }
            _ => Err(DomainError::validation(
                "tracking info requires a shipping-adjacent status",
            )),
        }
    }
}

impl Entity for SellRequest {
    type Id = SellRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
