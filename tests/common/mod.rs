//! Shared fixtures for integration tests.
//!
//! Descriptors are compiled from in-memory `.proto` sources with the crate's
//! own parser; `User` and `Address` are hand-derived prost types bound to
//! those descriptors.

#![allow(dead_code)]

use std::sync::OnceLock;

use prost_reflect::{FileDescriptor, MessageDescriptor, ReflectMessage};
use protoreg::protobuf::{ProtoxParser, SchemaParser};

pub const USER_PROTO: &str = r#"
syntax = "proto3";
package fixture;

message User {
  message Address {
    string street = 1;
    string postal_code = 2;
    string city = 3;
    string country = 4;
  }

  string id = 1;
  string name = 2;
  repeated Address addresses = 3;
}
"#;

pub const ORDER_PROTO: &str = r#"
syntax = "proto3";
package shop;

import "money.proto";
import "customer.proto";

message Order {
  string id = 1;
  Money total = 2;
  Customer customer = 3;
}
"#;

pub const MONEY_PROTO: &str = r#"
syntax = "proto3";
package shop;

import "currency.proto";

message Money {
  int64 units = 1;
  Currency currency = 2;
}
"#;

pub const CURRENCY_PROTO: &str = r#"
syntax = "proto3";
package shop;

enum Currency {
  CURRENCY_UNSPECIFIED = 0;
  EUR = 1;
  USD = 2;
}
"#;

pub const CUSTOMER_PROTO: &str = r#"
syntax = "proto3";
package shop;

message Customer {
  string email = 1;
}
"#;

pub const LABELED_PROTO: &str = r#"
syntax = "proto3";
package labeled;

message Item {
  map<string, string> labels = 1;
  message Part {
    string sku = 1;
  }
  Part part = 2;
}
"#;

/// Compile `sources` and return their descriptors in the same order.
pub fn compile(sources: &[(&str, &str)]) -> Vec<FileDescriptor> {
    let owned: Vec<(String, String)> = sources
        .iter()
        .map(|(name, text)| (name.to_string(), text.to_string()))
        .collect();
    ProtoxParser::new().parse(&owned).unwrap()
}

/// `user.proto`, compiled once.
pub fn user_file() -> FileDescriptor {
    static FILE: OnceLock<FileDescriptor> = OnceLock::new();
    FILE.get_or_init(|| compile(&[("user.proto", USER_PROTO)]).remove(0))
        .clone()
}

/// `order.proto` with its imports: order -> [money -> [currency], customer].
pub fn order_files() -> Vec<FileDescriptor> {
    compile(&[
        ("order.proto", ORDER_PROTO),
        ("money.proto", MONEY_PROTO),
        ("currency.proto", CURRENCY_PROTO),
        ("customer.proto", CUSTOMER_PROTO),
    ])
}

pub fn message(file: &FileDescriptor, full_name: &str) -> MessageDescriptor {
    file.parent_pool().get_message_by_name(full_name).unwrap()
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(message, repeated, tag = "3")]
    pub addresses: Vec<Address>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Address {
    #[prost(string, tag = "1")]
    pub street: String,
    #[prost(string, tag = "2")]
    pub postal_code: String,
    #[prost(string, tag = "3")]
    pub city: String,
    #[prost(string, tag = "4")]
    pub country: String,
}

impl ReflectMessage for User {
    fn descriptor(&self) -> MessageDescriptor {
        message(&user_file(), "fixture.User")
    }
}

impl ReflectMessage for Address {
    fn descriptor(&self) -> MessageDescriptor {
        message(&user_file(), "fixture.User.Address")
    }
}

pub fn sample_user() -> User {
    User {
        id: "u-1".into(),
        name: "Ana".into(),
        addresses: vec![Address {
            street: "Kolodvorska 46".into(),
            postal_code: "1218".into(),
            city: "Ljubljana".into(),
            country: "Slovenia".into(),
        }],
    }
}
