// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use std::sync::{Arc, Mutex};

/// Signer is the main struct used to sign the request.
///
/// The loaded credential is cached and reused until it is no longer valid,
/// so signing the same logical request again (for example on every retry
/// attempt) never reloads the credential.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    loader: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<Mutex<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        loader: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            loader: Arc::new(loader),
            builder: Arc::new(builder),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign the request.
    ///
    /// Returns [`crate::ErrorKind::CredentialInvalid`] if no credential could be loaded.
    pub async fn sign(
        &self,
        req: &mut http::request::Parts,
    ) -> Result<()> {
        let cached = self.cached();
        let credential = if cached.is_valid() {
            cached
        } else {
            let loaded = self.loader.provide_credential(&self.ctx).await?;
            if let Ok(mut guard) = self.credential.lock() {
                guard.clone_from(&loaded);
            }
            loaded
        };

        let Some(credential) = credential.filter(|c| c.is_valid()) else {
            return Err(Error::credential_invalid(
                "no valid credential found for signing",
            ));
        };

        self.builder
            .sign_request(&self.ctx, req, Some(&credential))
            .await
    }

    fn cached(&self) -> Option<K> {
        match self.credential.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        }
    }
}
