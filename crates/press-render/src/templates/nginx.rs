//! nginx global config and per-site server blocks.

use press_core::{AllocationPlan, PressConfig};

use super::banner;

/// Per-worker connection ceiling; nginx default is 512.
const WORKER_CONNECTIONS: u32 = 1024;

pub fn global(plan: &AllocationPlan, config: &PressConfig) -> String {
    let nginx_dir = config.web.nginx_dir.display();
    format!(
        "{banner}\
user {user};
worker_processes {workers};
worker_rlimit_nofile {rlimit};
pid /run/nginx.pid;
include {nginx_dir}/modules-enabled/*.conf;

events {{
    worker_connections {connections};
    multi_accept on;
}}

http {{
    sendfile on;
    tcp_nopush on;
    tcp_nodelay on;
    keepalive_timeout 65;
    types_hash_max_size 2048;
    server_tokens off;

    client_max_body_size {body}M;
    client_body_timeout 60s;

    include {nginx_dir}/mime.types;
    default_type application/octet-stream;

    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_prefer_server_ciphers off;
    ssl_session_cache shared:SSL:10m;

    access_log /var/log/nginx/access.log;
    error_log /var/log/nginx/error.log;

    gzip on;
    gzip_vary on;
    gzip_proxied any;
    gzip_comp_level 5;
    gzip_types text/plain text/css application/json application/javascript text/xml application/xml image/svg+xml;

    include {nginx_dir}/conf.d/*.conf;
    include {nginx_dir}/sites-enabled/*;
}}
",
        banner = banner("#", plan.tier),
        user = config.web.user,
        workers = plan.web_worker_count,
        rlimit = WORKER_CONNECTIONS * 2,
        connections = WORKER_CONNECTIONS,
        body = plan.upload_max_mb,
    )
}

/// Server block for one site. With `tls`, port 80 only redirects.
pub fn site(domain: &str, tls: bool, plan: &AllocationPlan, config: &PressConfig) -> String {
    let mut out = banner("#", plan.tier);
    if tls {
        out.push_str(&format!(
            "server {{
    listen 80;
    listen [::]:80;
    server_name {domain} www.{domain};

    location /.well-known/acme-challenge/ {{
        root {root};
    }}

    location / {{
        return 301 https://{domain}$request_uri;
    }}
}}

",
            root = config.site_root(domain).display(),
        ));
    }

    let listen = if tls {
        format!(
            "    listen 443 ssl;
    listen [::]:443 ssl;
    http2 on;
    ssl_certificate {cert};
    ssl_certificate_key {key};
",
            cert = config.certificate_path(domain).display(),
            key = config.certificate_key_path(domain).display(),
        )
    } else {
        "    listen 80;\n    listen [::]:80;\n".to_string()
    };

    out.push_str(&format!(
        "server {{
{listen}    server_name {domain} www.{domain};
    root {root};
    index index.php index.html;

    client_max_body_size {body}M;

    access_log /var/log/nginx/{domain}.access.log;
    error_log /var/log/nginx/{domain}.error.log;

    location / {{
        try_files $uri $uri/ /index.php?$args;
    }}

    location ~ \\.php$ {{
        include snippets/fastcgi-php.conf;
        fastcgi_pass unix:{socket};
        fastcgi_read_timeout 300;
    }}

    location ~* \\.(css|js|gif|ico|jpe?g|png|svg|webp|woff2?)$ {{
        expires 30d;
        access_log off;
    }}

    location = /xmlrpc.php {{
        deny all;
    }}

    location ~ /\\.(?!well-known) {{
        deny all;
    }}
}}
",
        root = config.site_root(domain).display(),
        body = plan.upload_max_mb,
        socket = config.php_socket(),
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use press_core::{ResourceSnapshot, compute_allocation};

    fn plan(cpu: u32, ram: u64) -> AllocationPlan {
        compute_allocation(&ResourceSnapshot::new(cpu, ram, 20))
    }

    #[test]
    fn global_uses_cpu_workers_and_upload_limit() {
        let text = global(&plan(2, 1024), &PressConfig::default());
        assert!(text.contains("worker_processes 2;\n"));
        assert!(text.contains("client_max_body_size 64M;\n"));
        assert!(text.contains("include /etc/nginx/sites-enabled/*;"));
    }

    #[test]
    fn plain_site_block() {
        let text = site("a.test", false, &plan(2, 1024), &PressConfig::default());
        assert!(text.contains("server_name a.test www.a.test;"));
        assert!(text.contains("root /var/www/a.test;"));
        assert!(text.contains("fastcgi_pass unix:/run/php/php8.3-fpm.sock;"));
        assert!(text.contains("location ~ \\.php$ {"));
        assert!(!text.contains("443"));
    }

    #[test]
    fn tls_site_redirects_and_serves_https() {
        let text = site("a.test", true, &plan(2, 1024), &PressConfig::default());
        assert!(text.contains("return 301 https://a.test$request_uri;"));
        assert!(text.contains("listen 443 ssl;"));
        assert!(text.contains("ssl_certificate /etc/letsencrypt/live/a.test/fullchain.pem;"));
        assert_eq!(text.matches("server {").count(), 2);
    }
}
