//! `crd generate`/`crd install` (grounded on the teacher's
//! `commands/crd.rs`), generalized from one CRD kind to all six.

use anyhow::Result;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{Api, Client, CustomResourceExt};

use yuptime::crd::{MaintenanceWindow, Monitor, NotificationPolicy, NotificationProvider, Silence, StatusPage};

fn all_crds() -> Vec<CustomResourceDefinition> {
    vec![
        Monitor::crd(),
        MaintenanceWindow::crd(),
        Silence::crd(),
        NotificationPolicy::crd(),
        NotificationProvider::crd(),
        StatusPage::crd(),
    ]
}

/// Prints every yuptime CRD YAML manifest to stdout for `kubectl apply -f`.
pub fn generate() -> Result<()> {
    for crd in all_crds() {
        println!("{}", serde_yaml::to_string(&crd)?);
        println!("---");
    }
    Ok(())
}

/// Applies every yuptime CRD directly to the connected cluster.
pub async fn install() -> Result<()> {
    let client = Client::try_default().await?;
    let crds: Api<CustomResourceDefinition> = Api::all(client);

    for crd in all_crds() {
        let name = crd.metadata.name.clone().unwrap_or_default();
        match crds.create(&Default::default(), &crd).await {
            Ok(_) => println!("CRD '{name}' installed successfully"),
            Err(kube::Error::Api(err)) if err.code == 409 => println!("CRD '{name}' already exists — skipping"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
