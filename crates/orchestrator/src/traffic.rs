use ml_structs::{Project, ProjectModel};
use platform_client::ProductionVariant;

/// Builds the production variants of an endpoint config for deploying `deploying`.
///
/// Returns nothing unless the project auto-deploys and `deploying` is part of
/// its traffic split. Otherwise every weighted variant with a stored serving
/// spec is included: the deployed one with `new_model`, the rest with their
/// `latest_model`. Variants without a spec, or without a promoted model when
/// they are not the one being deployed, are left out.
#[must_use]
pub fn plan_traffic(
    project: &Project,
    deploying: &str,
    new_model: &str,
    variants: &[ProjectModel],
) -> Vec<ProductionVariant> {
    if !project.is_auto_deploy || project.weight(deploying).is_none() {
        return Vec::new();
    }

    project
        .variants
        .iter()
        .filter_map(|(variant_name, &weight)| {
            let stored = variants
                .iter()
                .find(|model| model.variant_name == *variant_name)?;
            let spec = stored.spec_serve.as_ref()?;
            let model_name = if variant_name == deploying {
                new_model
            } else {
                stored.latest_model.as_deref()?
            };
            Some(ProductionVariant::from_spec(variant_name, model_name, spec, weight))
        })
        .collect()
}
