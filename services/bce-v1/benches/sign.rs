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

use bcesign_bce_v1::{sign, Credential, RequestSigner, SignOptions};
use bcesign_core::{Context, SignRequest};
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use http::{HeaderMap, HeaderValue, Method};
use once_cell::sync::Lazy;

criterion_group!(benches, bench);
criterion_main!(benches);

static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("must success")
});

pub fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("bce_v1");

    group.bench_function("sign", |b| {
        let cred = Credential::new("access_key_id", "secret_access_key");
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("bcc.bj.baidubce.com"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-bce-date", HeaderValue::from_static("2024-01-01T00:00:00Z"));
        let params = vec![("maxKeys".to_string(), "10".to_string())];
        let options = SignOptions::default();

        b.iter(|| {
            sign(
                &cred,
                &Method::GET,
                "/v2/instance",
                &headers,
                &params,
                &options,
            )
            .expect("must success")
        })
    });

    group.bench_function("sign_request", |b| {
        let cred = Credential::new("access_key_id", "secret_access_key");
        let signer = RequestSigner::new();
        let ctx = Context::new();

        b.to_async(&*RUNTIME).iter(|| async {
            let mut req = http::Request::new("");
            *req.method_mut() = Method::GET;
            *req.uri_mut() = "http://bcc.bj.baidubce.com/v2/instance?maxKeys=10"
                .parse()
                .expect("url must be valid");

            let (mut parts, _) = req.into_parts();
            signer
                .sign_request(&ctx, &mut parts, Some(&cred), None)
                .await
                .expect("must success")
        })
    });

    group.finish();
}
