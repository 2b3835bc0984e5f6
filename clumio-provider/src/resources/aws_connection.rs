//! aws_connection - Link between an AWS account/region and Clumio
//!
//! Only `description` can change in place. The connection `token` and the
//! Clumio side account/region are computed and used to deploy the
//! CloudFormation template on the AWS side.

use std::collections::HashMap;

use clumio_core::provider::{ProviderError, ProviderResult};
use clumio_core::resource::{Resource, ResourceId, State, Value};
use log::{debug, info};

use crate::models::{AwsConnection, CreateAwsConnectionRequest, UpdateAwsConnectionRequest};
use crate::provider::ClumioProvider;
use crate::utils::{
    eq_filter, insert_str, insert_string_list, optional_str, optional_string_list, required_str,
    validate_account_id, validate_aws_region,
};
use crate::waiters::{wait_for_connection_ready, wait_for_connection_update};

/// Attributes fixed at creation
const IMMUTABLE_ATTRIBUTES: &[&str] =
    &["account_native_id", "aws_region", "organizational_unit_id"];

pub fn to_attributes(conn: AwsConnection) -> HashMap<String, Value> {
    let mut attributes = HashMap::new();
    insert_str(&mut attributes, "id", conn.id);
    insert_str(&mut attributes, "account_native_id", conn.account_native_id);
    insert_str(&mut attributes, "aws_region", conn.aws_region);
    insert_str(&mut attributes, "description", conn.description);
    insert_str(&mut attributes, "connection_status", conn.connection_status);
    insert_str(&mut attributes, "token", conn.token);
    insert_str(&mut attributes, "namespace", conn.namespace);
    insert_str(
        &mut attributes,
        "clumio_aws_account_id",
        conn.clumio_aws_account_id,
    );
    insert_str(&mut attributes, "clumio_aws_region", conn.clumio_aws_region);
    insert_str(
        &mut attributes,
        "organizational_unit_id",
        conn.organizational_unit_id,
    );
    insert_string_list(&mut attributes, "services_enabled", conn.services_enabled);
    attributes
}

fn to_state(id: &ResourceId, conn: AwsConnection) -> ProviderResult<State> {
    let identifier = conn
        .id
        .clone()
        .ok_or_else(|| ProviderError::nil_response().for_resource(id.clone()))?;
    Ok(State::existing(id.clone(), to_attributes(conn)).with_identifier(identifier))
}

pub async fn read(
    provider: &ClumioProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<State> {
    match provider.client().read_aws_connection(identifier).await {
        Ok(conn) => to_state(id, conn),
        Err(err) if err.is_not_found() => Ok(State::not_found(id.clone())),
        Err(err) => Err(ProviderError::from(err).for_resource(id.clone())),
    }
}

pub async fn create(provider: &ClumioProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let account_native_id = required_str(resource, "account_native_id")?;
    let aws_region = required_str(resource, "aws_region")?;
    validate_account_id(id, &account_native_id)?;
    validate_aws_region(id, &aws_region)?;

    let organizational_unit_id = optional_str(resource, "organizational_unit_id");
    let request = CreateAwsConnectionRequest {
        account_native_id,
        aws_region,
        description: optional_str(resource, "description"),
        organizational_unit_id: organizational_unit_id.clone(),
        services_enabled: optional_string_list(resource, "services_enabled"),
    };

    let client = provider.client_for(organizational_unit_id.as_deref());
    let created = client
        .create_aws_connection(&request)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
    let connection_id = created
        .id
        .ok_or_else(|| ProviderError::nil_response().for_resource(id.clone()))?;
    info!("created AWS connection {}", connection_id);

    let conn = wait_for_connection_ready(
        client.as_ref(),
        provider.poll(),
        provider.cancel(),
        &connection_id,
    )
    .await
    .map_err(|e| e.for_resource(id.clone()))?;
    to_state(id, conn)
}

/// Reject changes that cannot be applied in place
fn check_replacement(from: &State, to: &Resource) -> ProviderResult<()> {
    for key in IMMUTABLE_ATTRIBUTES {
        if let Some(desired) = to.get_str(key)
            && from.get_str(key) != Some(desired)
        {
            return Err(ProviderError::invalid_config(format!(
                "changing {} requires replacement",
                key
            ))
            .for_resource(to.id.clone()));
        }
    }
    Ok(())
}

pub async fn update(
    provider: &ClumioProvider,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let id = &to.id;
    check_replacement(from, to)?;

    let description = optional_str(to, "description").unwrap_or_default();
    if from.get_str("description").unwrap_or_default() == description {
        debug!("{}: description unchanged, skipping update", id);
        return read(provider, id, identifier).await;
    }

    let request = UpdateAwsConnectionRequest {
        description: Some(description.clone()),
    };
    provider
        .client()
        .update_aws_connection(identifier, &request)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;

    let conn = wait_for_connection_update(
        provider.client(),
        provider.poll(),
        provider.cancel(),
        identifier,
        &description,
    )
    .await
    .map_err(|e| e.for_resource(id.clone()))?;
    to_state(id, conn)
}

pub async fn delete(
    provider: &ClumioProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<()> {
    provider
        .client()
        .delete_aws_connection(identifier)
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))
}

/// Data source: find the connection of an account/region pair
pub async fn lookup(provider: &ClumioProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let account_native_id = required_str(resource, "account_native_id")?;
    let aws_region = required_str(resource, "aws_region")?;
    let filter = eq_filter(&[
        ("account_native_id", account_native_id.as_str()),
        ("aws_region", aws_region.as_str()),
    ]);

    let mut matches = provider
        .client()
        .list_aws_connections(Some(&filter))
        .await
        .map_err(|e| ProviderError::from(e).for_resource(id.clone()))?;
    match matches.len() {
        1 => to_state(id, matches.remove(0)),
        0 => Err(ProviderError::invalid_config(format!(
            "no AWS connection found for account {} in {}",
            account_native_id, aws_region
        ))
        .for_resource(id.clone())),
        n => Err(ProviderError::invalid_config(format!(
            "{} AWS connections found for account {} in {}, expected exactly one",
            n, account_native_id, aws_region
        ))
        .for_resource(id.clone())),
    }
}
