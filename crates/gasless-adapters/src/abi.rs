use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{keccak256, Bytes};

use gasless_core::{AbiPort, PortError};

/// Runtime encoder over a JSON ABI. Arguments are strings coerced by the
/// parameter's Solidity type: decimal or `0x` integers, hex addresses and
/// bytes, `[..]` arrays and `(..)` tuples.
#[derive(Debug, Clone, Default)]
pub struct AbiAdapter;

impl AbiPort for AbiAdapter {
    fn encode_calldata(
        &self,
        abi_json: &str,
        method_signature: &str,
        args: &[String],
    ) -> Result<(Bytes, [u8; 4]), PortError> {
        let abi: JsonAbi = serde_json::from_str(abi_json)
            .map_err(|e| PortError::Validation(format!("invalid abi json: {e}")))?;
        let function = resolve(&abi, method_signature, args.len())?;
        let values = coerce_args(function, args)?;

        let calldata = function.abi_encode_input(&values).map_err(|e| {
            PortError::Validation(format!("{}: encoding failed: {e}", function.name))
        })?;
        tracing::trace!(method = %function.signature(), bytes = calldata.len(), "abi encoded");
        Ok((Bytes::from(calldata), function.selector().0))
    }

    fn selector_from_method_signature(&self, method_signature: &str) -> Result<[u8; 4], PortError> {
        if !method_signature.ends_with(')') || !method_signature.contains('(') {
            return Err(PortError::Validation(format!(
                "full method signature required: {method_signature}"
            )));
        }
        let digest = keccak256(method_signature.as_bytes());
        Ok([digest[0], digest[1], digest[2], digest[3]])
    }
}

fn coerce_args(function: &Function, args: &[String]) -> Result<Vec<DynSolValue>, PortError> {
    function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, raw)| {
            let ty = DynSolType::parse(&param.ty).map_err(|e| {
                PortError::Validation(format!("unsupported type '{}': {e}", param.ty))
            })?;
            ty.coerce_str(raw.trim()).map_err(|e| {
                PortError::Validation(format!("arg '{}' parse failed: {e}", param.name))
            })
        })
        .collect()
}

/// `name(type,..)` matches exactly; a bare `name` takes the overload whose
/// arity equals the argument count.
fn resolve<'a>(
    abi: &'a JsonAbi,
    method_signature: &str,
    arity: usize,
) -> Result<&'a Function, PortError> {
    let (name, typed) = match method_signature.split_once('(') {
        Some((name, _)) => (name, true),
        None => (method_signature, false),
    };
    let overloads = abi
        .function(name)
        .ok_or_else(|| PortError::Validation(format!("method not found: {name}")))?;

    let found = if typed {
        overloads.iter().find(|f| f.signature() == method_signature)
    } else {
        overloads.iter().find(|f| f.inputs.len() == arity)
    };
    found.ok_or_else(|| {
        if typed {
            PortError::Validation(format!("method signature not found: {method_signature}"))
        } else {
            PortError::Validation(format!(
                "argument count mismatch: no {name} overload takes {arity} arguments"
            ))
        }
    })
}
