use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use super::{Check, CheckError, HelpText, Level, Metadata, Outcome};
use crate::image::{ImageReference, digest_of};
use crate::pyxis::{CertImage, PyxisClient};

const CSV_SUFFIXES: [&str; 2] = [".clusterserviceversion.yaml", ".clusterserviceversion.yml"];

/// Verifies that every digest-pinned image the operator references is a
/// certified image in Pyxis.
pub struct CertifiedImagesCheck {
    pyxis: Arc<PyxisClient>,
}

impl CertifiedImagesCheck {
    pub fn new(pyxis: Arc<PyxisClient>) -> Self {
        Self { pyxis }
    }
}

fn manifest_error(path: &Path, reason: impl ToString) -> CheckError {
    CheckError::Manifest {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Image pull specs referenced by a ClusterServiceVersion: `relatedImages`
/// plus the containers and init containers of every install deployment.
pub fn images_in_csv(csv: &Value) -> Vec<String> {
    let spec = &csv["spec"];
    let mut images = Vec::new();

    if let Some(related) = spec["relatedImages"].as_sequence() {
        images.extend(
            related
                .iter()
                .filter_map(|r| r["image"].as_str())
                .map(str::to_string),
        );
    }

    if let Some(deployments) = spec["install"]["spec"]["deployments"].as_sequence() {
        for deployment in deployments {
            let pod = &deployment["spec"]["template"]["spec"];
            for key in ["initContainers", "containers"] {
                if let Some(containers) = pod[key].as_sequence() {
                    images.extend(
                        containers
                            .iter()
                            .filter_map(|c| c["image"].as_str())
                            .map(str::to_string),
                    );
                }
            }
        }
    }

    images
}

/// Digests of all digest-pinned images in the bundle's CSVs, sorted and
/// deduplicated. Tag references are skipped.
pub fn bundle_image_digests(bundle: &Path) -> Result<Vec<String>, CheckError> {
    let manifests = bundle.join("manifests");
    let entries = std::fs::read_dir(&manifests).map_err(|e| manifest_error(&manifests, e))?;

    let mut csv_paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| CSV_SUFFIXES.iter().any(|s| n.ends_with(s)))
        })
        .collect();
    csv_paths.sort();

    if csv_paths.is_empty() {
        return Err(manifest_error(&manifests, "no ClusterServiceVersion found"));
    }

    let mut digests = BTreeSet::new();
    for path in &csv_paths {
        let raw = std::fs::read_to_string(path).map_err(|e| manifest_error(path, e))?;
        let csv: Value = serde_yaml::from_str(&raw).map_err(|e| manifest_error(path, e))?;
        for image in images_in_csv(&csv) {
            match digest_of(&image) {
                Some(digest) => {
                    digests.insert(digest.to_string());
                }
                None => debug!(%image, "skipping image not pinned by digest"),
            }
        }
    }

    Ok(digests.into_iter().collect())
}

/// True iff every digest has at least one catalog record and every record
/// for it is certified and not deleted. The catalog may hold several records
/// for one digest (one per repository it was pushed to).
pub fn all_certified(digests: &[String], records: &[CertImage]) -> bool {
    let mut by_digest: BTreeMap<&str, Vec<&CertImage>> = BTreeMap::new();
    for record in records {
        by_digest
            .entry(record.docker_image_digest.as_str())
            .or_default()
            .push(record);
    }

    let mut passed = true;
    for digest in digests {
        let Some(found) = by_digest.get(digest.as_str()) else {
            warn!(%digest, "image not found in the certification catalog");
            passed = false;
            continue;
        };
        for record in found {
            if record.certified && !record.deleted {
                debug!(%digest, id = %record.id, "image is certified");
            } else {
                warn!(
                    %digest,
                    id = %record.id,
                    certified = record.certified,
                    deleted = record.deleted,
                    "image is not certified"
                );
                passed = false;
            }
        }
    }
    passed
}

#[async_trait]
impl Check for CertifiedImagesCheck {
    fn name(&self) -> &'static str {
        "CertifiedImages"
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            description: "Checking that all images referenced by the operator are certified".to_string(),
            level: Level::Good,
            knowledge_base_url: "https://access.redhat.com/documentation/en-us/red_hat_software_certification/".to_string(),
            check_url: "https://access.redhat.com/documentation/en-us/red_hat_software_certification/".to_string(),
        }
    }

    fn help(&self, outcome: &Outcome) -> HelpText {
        if outcome.is_fatal() {
            return HelpText {
                message: "The certification catalog could not be queried for the images referenced by this bundle.".to_string(),
                suggestion: "Check network access to the catalog host and retry. Set logging to be more verbose for details.".to_string(),
            };
        }
        HelpText {
            message: "One or more images referenced by the ClusterServiceVersion are not certified. The affected digests are listed in the log.".to_string(),
            suggestion: "Reference only certified images, pinned by digest, in relatedImages and in the install deployments.".to_string(),
        }
    }

    async fn validate(&self, image: &ImageReference) -> Result<bool, CheckError> {
        let digests = bundle_image_digests(image.fs_path())?;
        if digests.is_empty() {
            info!(image = %image.image_uri, "no digest-pinned images to verify");
            return Ok(true);
        }

        let records = self.pyxis.find_images_by_digest(&digests).await?;
        Ok(all_certified(&digests, &records))
    }
}
