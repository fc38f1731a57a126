use json_patch::{AddOperation, Patch, PatchOperation};
use jsonptr::PointerBuf;
use macpool_controller_k8s_api::{
    deletion_in_progress, ObjectMeta, Pod, VirtualMachine, NETWORKS_ANNOTATION,
    TRANSACTION_TIMESTAMP_ANNOTATION,
};
use macpool_controller_core::AdmissionError;
use serde::Serialize;

/// Patches for the mutations made to a pod. Only the managed networks
/// annotation is ever touched on pods.
pub(crate) fn pod_patches(original: &Pod, current: &Pod) -> Patch {
    let mut ops = Vec::new();
    if let Some(op) = annotation_patch(NETWORKS_ANNOTATION, &original.metadata, &current.metadata) {
        ops.push(op);
    }
    Patch(ops)
}

/// Patches for the mutations made to a virtual machine, evaluated in a fixed
/// order: transaction timestamp, per-interface MAC addresses, finalizers.
/// Identical inputs on every whitelisted path yield an empty patch.
///
/// Once deletion is in progress the timestamp and MAC patches are suppressed:
/// cleanup of allocated state belongs to the deletion-time reconciler, and
/// re-stamping a dying object would only confuse it. Finalizer diffs are
/// still emitted; those are intentional lifecycle changes.
pub(crate) fn virtual_machine_patches(
    original: &VirtualMachine,
    current: &VirtualMachine,
) -> Result<Patch, AdmissionError> {
    let mut ops = Vec::new();

    if !deletion_in_progress(&current.metadata) {
        if let Some(op) = annotation_patch(
            TRANSACTION_TIMESTAMP_ANNOTATION,
            &original.metadata,
            &current.metadata,
        ) {
            ops.push(op);
        }

        let original_ifaces = &original.spec.template.spec.domain.devices.interfaces;
        let current_ifaces = &current.spec.template.spec.domain.devices.interfaces;
        for (idx, iface) in current_ifaces.iter().enumerate() {
            let original_mac = original_ifaces.get(idx).and_then(|i| i.mac_address.as_deref());
            ops.extend(field_diff(
                mac_address_path(idx),
                &original_mac,
                &iface.mac_address.as_deref(),
            )?);
        }
    }

    // Absent finalizer lists are normalized to empty so that the first token
    // surfaces as an add of that token, not a replacement of the whole list.
    ops.extend(field_diff(
        PointerBuf::from_tokens(["metadata", "finalizers"]),
        &original.metadata.finalizers.clone().unwrap_or_default(),
        &current.metadata.finalizers.clone().unwrap_or_default(),
    )?);

    Ok(Patch(ops))
}

/// Structural diff of one whitelisted field: both snapshots of the field are
/// compared as JSON values and every resulting operation is collapsed onto
/// `path`, so consumers see one operation per changed field rather than one
/// per changed leaf.
fn field_diff<T: Serialize>(
    path: PointerBuf,
    original: &T,
    current: &T,
) -> Result<Vec<PatchOperation>, AdmissionError> {
    let original = serde_json::to_value(original)?;
    let current = serde_json::to_value(current)?;
    let mut ops = json_patch::diff(&original, &current).0;
    for op in &mut ops {
        match op {
            PatchOperation::Add(add) => add.path = path.clone(),
            PatchOperation::Remove(remove) => remove.path = path.clone(),
            PatchOperation::Replace(replace) => replace.path = path.clone(),
            // diff only produces add/remove/replace.
            _ => {}
        }
    }
    Ok(ops)
}

/// Compares one managed annotation as a whole key/value pair, emitting a
/// single add carrying the key and its new value when they differ.
fn annotation_patch(key: &str, original: &ObjectMeta, current: &ObjectMeta) -> Option<PatchOperation> {
    let original = annotation(original, key);
    let current = annotation(current, key);
    if original == current {
        return None;
    }

    let mut value = serde_json::Map::new();
    value.insert(key.to_string(), current.unwrap_or_default().into());
    Some(PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(["metadata", "annotations"]),
        value: value.into(),
    }))
}

fn annotation<'m>(meta: &'m ObjectMeta, key: &str) -> Option<&'m str> {
    meta.annotations.as_ref()?.get(key).map(String::as_str)
}

fn mac_address_path(idx: usize) -> PointerBuf {
    let idx = idx.to_string();
    PointerBuf::from_tokens([
        "spec",
        "template",
        "spec",
        "domain",
        "devices",
        "interfaces",
        idx.as_str(),
        "macAddress",
    ])
}
