use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Notification row exactly as the marketplace API serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NotificationRecord", into = "NotificationRecord")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
}

/// Known notification kinds with their decoded payloads.
///
/// Anything the client does not understand lands in `Other`, which keeps the
/// original tag and payload so the record survives a round trip untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    DeliveryAssignment(AssignmentDetails),
    Approval(ApprovalDetails),
    OrderUpdate(OrderDetails),
    Generic(Option<Value>),
    Other { tag: String, payload: Option<Value> },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignmentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    /// Wire tag when the server used one of the approval aliases.
    #[serde(skip)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Wire tag when the server used `order_status` instead of `order_update`.
    #[serde(skip)]
    pub alias: Option<String>,
}

const DELIVERY_ASSIGNMENT: &str = "delivery_assignment";
const APPROVAL: &str = "approval";
const STORE_APPROVAL: &str = "store_approval";
const SHOPKEEPER_APPROVAL: &str = "shopkeeper_approval";
const ORDER_UPDATE: &str = "order_update";
const ORDER_STATUS: &str = "order_status";
const GENERIC: &str = "generic";

impl NotificationKind {
    pub fn from_wire(tag: &str, payload: Option<Value>) -> Self {
        match tag {
            DELIVERY_ASSIGNMENT => decode(payload, tag, Self::DeliveryAssignment),
            APPROVAL | STORE_APPROVAL | SHOPKEEPER_APPROVAL => {
                decode(payload, tag, |mut details: ApprovalDetails| {
                    details.alias = alias_of(tag, APPROVAL);
                    Self::Approval(details)
                })
            }
            ORDER_UPDATE | ORDER_STATUS => decode(payload, tag, |mut details: OrderDetails| {
                details.alias = alias_of(tag, ORDER_UPDATE);
                Self::OrderUpdate(details)
            }),
            GENERIC => Self::Generic(payload),
            _ => Self::Other {
                tag: tag.to_string(),
                payload,
            },
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::DeliveryAssignment(_) => DELIVERY_ASSIGNMENT,
            Self::Approval(details) => details.alias.as_deref().unwrap_or(APPROVAL),
            Self::OrderUpdate(details) => details.alias.as_deref().unwrap_or(ORDER_UPDATE),
            Self::Generic(_) => GENERIC,
            Self::Other { tag, .. } => tag,
        }
    }

    fn into_wire(self) -> (String, Option<Value>) {
        let tag = self.as_tag().to_string();
        let payload = match self {
            Self::DeliveryAssignment(details) => encode(&details),
            Self::Approval(details) => encode(&details),
            Self::OrderUpdate(details) => encode(&details),
            Self::Generic(payload) | Self::Other { payload, .. } => payload,
        };
        (tag, payload)
    }
}

fn alias_of(tag: &str, canonical: &str) -> Option<String> {
    (tag != canonical).then(|| tag.to_string())
}

fn decode<T, F>(payload: Option<Value>, tag: &str, wrap: F) -> NotificationKind
where
    T: for<'de> Deserialize<'de> + Default,
    F: FnOnce(T) -> NotificationKind,
{
    match payload {
        None | Some(Value::Null) => wrap(T::default()),
        Some(value) => match serde_json::from_value::<T>(value.clone()) {
            Ok(details) => wrap(details),
            Err(err) => {
                tracing::debug!(error = %err, tag, "notification payload did not decode");
                NotificationKind::Other {
                    tag: tag.to_string(),
                    payload: Some(value),
                }
            }
        },
    }
}

fn encode<T: Serialize>(details: &T) -> Option<Value> {
    serde_json::to_value(details).ok()
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            kind: NotificationKind::from_wire(&record.notification_type, record.data),
            title: record.title,
            message: record.message,
            is_read: record.is_read,
            created_at: record.created_at,
        }
    }
}

impl From<Notification> for NotificationRecord {
    fn from(notification: Notification) -> Self {
        let (notification_type, data) = notification.kind.into_wire();
        Self {
            id: notification.id,
            user_id: notification.user_id,
            notification_type,
            title: notification.title,
            message: notification.message,
            data,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

impl Notification {
    /// Approvals and delivery assignments get the louder alert treatment.
    pub fn is_important(&self) -> bool {
        matches!(
            self.kind,
            NotificationKind::DeliveryAssignment(_) | NotificationKind::Approval(_)
        ) || mentions_approval(&self.title)
            || mentions_approval(&self.message)
    }

    /// Newest first: `created_at` descending, ties broken by id descending.
    pub fn newest_first(a: &Notification, b: &Notification) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

fn mentions_approval(text: &str) -> bool {
    text.to_lowercase().contains("approved")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(kind: &str, data: Value) -> Value {
        json!({
            "id": 7,
            "userId": 3,
            "type": kind,
            "title": "Heads up",
            "message": "Something happened",
            "data": data,
            "isRead": false,
            "createdAt": "2024-05-01T10:15:00.000Z"
        })
    }

    #[test]
    fn decodes_delivery_assignment_payload() {
        let notification: Notification = serde_json::from_value(record(
            "delivery_assignment",
            json!({ "deliveryId": 12, "orderId": 99, "pickupAddress": "Main Chowk" }),
        ))
        .unwrap();

        match &notification.kind {
            NotificationKind::DeliveryAssignment(details) => {
                assert_eq!(details.delivery_id, Some(12));
                assert_eq!(details.order_id, Some(99));
                assert_eq!(details.pickup_address.as_deref(), Some("Main Chowk"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(notification.is_important());
    }

    #[test]
    fn unknown_tag_falls_back_and_round_trips() {
        let raw = record("flash_sale", json!({ "discount": 20 }));
        let notification: Notification = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(
            notification.kind,
            NotificationKind::Other {
                tag: "flash_sale".to_string(),
                payload: Some(json!({ "discount": 20 })),
            }
        );

        let back = serde_json::to_value(&notification).unwrap();
        assert_eq!(back["type"], "flash_sale");
        assert_eq!(back["data"], json!({ "discount": 20 }));
    }

    #[test]
    fn malformed_known_payload_is_kept_as_other() {
        let notification: Notification =
            serde_json::from_value(record("order_update", json!({ "orderId": "not-a-number" })))
                .unwrap();

        assert!(matches!(
            notification.kind,
            NotificationKind::Other { ref tag, .. } if tag == "order_update"
        ));
    }

    #[test]
    fn missing_payload_decodes_to_defaults() {
        let mut raw = record("approval", Value::Null);
        raw.as_object_mut().unwrap().remove("data");
        let notification: Notification = serde_json::from_value(raw).unwrap();
        assert_eq!(
            notification.kind,
            NotificationKind::Approval(ApprovalDetails::default())
        );
    }

    #[test]
    fn importance_follows_title_message_and_kind() {
        let mut notification: Notification =
            serde_json::from_value(record("generic", Value::Null)).unwrap();
        assert!(!notification.is_important());

        notification.title = "Store Approved".to_string();
        assert!(notification.is_important());

        notification.title = "Hello".to_string();
        notification.message = "Your shop was approved today".to_string();
        assert!(notification.is_important());
    }

    #[test]
    fn approval_aliases_decode_as_important_and_keep_their_tag() {
        for tag in ["store_approval", "shopkeeper_approval"] {
            let raw = record(tag, json!({ "storeId": 4, "storeName": "Siraha Kirana" }));
            let notification: Notification = serde_json::from_value(raw).unwrap();

            match &notification.kind {
                NotificationKind::Approval(details) => {
                    assert_eq!(details.store_id, Some(4));
                    assert_eq!(details.alias.as_deref(), Some(tag));
                }
                other => panic!("{} decoded as {:?}", tag, other),
            }
            assert!(notification.is_important());

            let back = serde_json::to_value(&notification).unwrap();
            assert_eq!(back["type"], tag);
            assert_eq!(back["data"], json!({ "storeId": 4, "storeName": "Siraha Kirana" }));
        }
    }

    #[test]
    fn order_status_decodes_as_order_update_and_keeps_its_tag() {
        let raw = record("order_status", json!({ "orderId": 31, "status": "shipped" }));
        let notification: Notification = serde_json::from_value(raw).unwrap();

        match &notification.kind {
            NotificationKind::OrderUpdate(details) => {
                assert_eq!(details.order_id, Some(31));
                assert_eq!(details.status.as_deref(), Some("shipped"));
            }
            other => panic!("order_status decoded as {:?}", other),
        }
        assert!(!notification.is_important());

        let back = serde_json::to_value(&notification).unwrap();
        assert_eq!(back["type"], "order_status");
        assert_eq!(back["data"], json!({ "orderId": 31, "status": "shipped" }));
    }

    #[test]
    fn canonical_tags_carry_no_alias() {
        let notification: Notification =
            serde_json::from_value(record("approval", json!({ "storeId": 4 }))).unwrap();
        assert_eq!(notification.kind.as_tag(), "approval");
        assert_eq!(
            notification.kind,
            NotificationKind::Approval(ApprovalDetails {
                store_id: Some(4),
                ..ApprovalDetails::default()
            })
        );
    }
}
