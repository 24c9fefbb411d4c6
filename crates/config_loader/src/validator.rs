//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围与长度 (validator derive)
//! - stream_name 唯一
//! - partition_key 与 partition_key_property 至多配置一个
//! - 文件匹配模式可编译

use std::collections::HashSet;

use contracts::{ContractError, FilePattern, ShipperBlueprint};
use validator::Validate;

/// 校验 ShipperBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_stream_names(blueprint)?;
    validate_partition_keys(blueprint)?;
    validate_patterns(blueprint)?;
    Ok(())
}

/// 派生规则：长度、取值范围
fn validate_fields(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("streams", e.to_string()))
}

/// 校验 stream_name 唯一性
fn validate_stream_names(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for stream in &blueprint.streams {
        if !seen.insert(stream.stream_name.as_str()) {
            return Err(ContractError::config_validation(
                format!("streams[stream_name={}]", stream.stream_name),
                "duplicate stream_name",
            ));
        }
    }
    Ok(())
}

/// 静态 key 与字段 key 互斥
fn validate_partition_keys(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    for stream in &blueprint.streams {
        if stream.partition_key.is_some() && stream.partition_key_property.is_some() {
            return Err(ContractError::config_validation(
                format!("streams[{}].partition_key", stream.stream_name),
                "partition_key and partition_key_property are mutually exclusive",
            ));
        }
    }
    Ok(())
}

/// 校验文件匹配模式
fn validate_patterns(blueprint: &ShipperBlueprint) -> Result<(), ContractError> {
    for stream in &blueprint.streams {
        for (idx, raw) in stream.files.iter().enumerate() {
            FilePattern::compile(raw).map_err(|e| {
                ContractError::config_validation(
                    format!("streams[{}].files[{}]", stream.stream_name, idx),
                    e.to_string(),
                )
            })?;
        }
    }
    Ok(())
}
