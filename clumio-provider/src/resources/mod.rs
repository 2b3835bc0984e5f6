//! Resource type definitions
//!
//! Each submodule maps one resource type between `Resource`/`State`
//! attributes and the API models, and drives the waits that follow a
//! mutating call.

use clumio_core::provider::ResourceType;

pub mod aws_connection;
pub mod protection_group;
pub mod s3_bucket_properties;

pub const AWS_CONNECTION: &str = "aws_connection";
pub const PROTECTION_GROUP: &str = "protection_group";
pub const S3_BUCKET_PROPERTIES: &str = "s3_bucket_properties";

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, data_source: $data_source:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn has_data_source(&self) -> bool {
                $data_source
            }
        }
    };
}

define_resource_type!(AwsConnectionType, AWS_CONNECTION, data_source: true);
define_resource_type!(ProtectionGroupType, PROTECTION_GROUP, data_source: true);
define_resource_type!(S3BucketPropertiesType, S3_BUCKET_PROPERTIES, data_source: false);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(AwsConnectionType),
        Box::new(ProtectionGroupType),
        Box::new(S3BucketPropertiesType),
    ]
}
